// ABOUTME: Common utilities and helpers for integration tests
// ABOUTME: In-memory provider fakes and a temp directory environment for template files

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::runtime::Handle;

use entrypoint::providers::{ObjectStore, ProviderError, RegionSource, Result, SecretStore};
use entrypoint::Providers;

#[derive(Default)]
pub struct FakeSecrets {
    secrets: HashMap<String, String>,
}

impl FakeSecrets {
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.secrets.insert(name.to_string(), value.to_string());
        self
    }
}

#[async_trait]
impl SecretStore for FakeSecrets {
    async fn get_secret(&self, name: &str) -> Result<String> {
        self.secrets
            .get(name)
            .cloned()
            .ok_or_else(|| ProviderError::Secret {
                name: name.to_string(),
                message: "ResourceNotFoundException".to_string(),
            })
    }
}

#[derive(Default)]
pub struct FakeObjects {
    objects: HashMap<(String, String), String>,
}

impl FakeObjects {
    pub fn with(mut self, bucket: &str, key: &str, body: &str) -> Self {
        self.objects
            .insert((bucket.to_string(), key.to_string()), body.to_string());
        self
    }
}

#[async_trait]
impl ObjectStore for FakeObjects {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<String> {
        self.objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| ProviderError::Object {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: "NoSuchKey".to_string(),
            })
    }
}

pub struct FakeRegion(pub &'static str);

#[async_trait]
impl RegionSource for FakeRegion {
    async fn region(&self) -> Result<String> {
        Ok(self.0.to_string())
    }
}

/// Providers backed by the given fakes, driven on the current runtime
pub fn providers(secrets: FakeSecrets, objects: FakeObjects) -> Providers {
    Providers::new(
        Arc::new(secrets),
        Arc::new(objects),
        Arc::new(FakeRegion("us-west-2")),
        Handle::current(),
    )
}

pub fn empty_providers() -> Providers {
    providers(FakeSecrets::default(), FakeObjects::default())
}

pub struct TestEnvironment {
    pub temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Write a file and return its path
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, content).expect("Failed to write test file");
        path
    }

    pub fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.path(name)).expect("Failed to read test file")
    }

    /// Comma separated list of template paths for ENTRYPOINT_TEMPLATES
    pub fn template_list(&self, names: &[&str]) -> String {
        names
            .iter()
            .map(|name| self.path(name).display().to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}
