// ABOUTME: Provider clients backing the template functions (secrets, S3, region, system facts)
// ABOUTME: Clients are injected behind traits and shared read-only by every render

pub mod aws;
pub mod error;
pub mod metadata;
pub mod system;

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::debug;

pub use aws::{AwsSession, S3ObjectStore, SecretsManagerStore};
pub use error::{ProviderError, Result};
pub use metadata::MetadataRegion;
pub use system::SystemProbe;

/// Upper bound for every outbound call made on behalf of a template.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_secret(&self, name: &str) -> Result<String>;
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<String>;
}

#[async_trait]
pub trait RegionSource: Send + Sync {
    async fn region(&self) -> Result<String>;
}

/// The dependency set handed to the template engine.
///
/// Template helpers are synchronous, so lookups that need the network are
/// driven to completion on `runtime`. Callers must only render from a
/// blocking-pool thread (see `tokio::task::spawn_blocking`), never from an
/// async worker.
#[derive(Clone)]
pub struct Providers {
    secrets: Arc<dyn SecretStore>,
    objects: Arc<dyn ObjectStore>,
    region: Arc<dyn RegionSource>,
    system: SystemProbe,
    runtime: Handle,
    timeout: Duration,
}

impl Providers {
    pub fn new(
        secrets: Arc<dyn SecretStore>,
        objects: Arc<dyn ObjectStore>,
        region: Arc<dyn RegionSource>,
        runtime: Handle,
    ) -> Self {
        Self {
            secrets,
            objects,
            region,
            system: SystemProbe::default(),
            runtime,
            timeout: FETCH_TIMEOUT,
        }
    }

    /// Wire up the AWS-backed clients. Nothing is contacted until a template
    /// or the vars document actually needs it.
    pub fn aws(configured_region: Option<String>, runtime: Handle) -> Result<Self> {
        let region: Arc<dyn RegionSource> = Arc::new(MetadataRegion::new(configured_region)?);
        let session = Arc::new(AwsSession::new(Arc::clone(&region)));

        Ok(Self::new(
            Arc::new(SecretsManagerStore::new(Arc::clone(&session))),
            Arc::new(S3ObjectStore::new(session)),
            region,
            runtime,
        ))
    }

    pub fn with_system(mut self, system: SystemProbe) -> Self {
        self.system = system;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Apply the fetch timeout to a provider future.
    pub async fn fetch<T, F>(&self, operation: &str, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        debug!("Provider fetch: {}", operation);
        match tokio::time::timeout(self.timeout, future).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                operation: operation.to_string(),
                timeout: self.timeout,
            }),
        }
    }

    fn fetch_blocking<T, F>(&self, operation: &str, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.runtime.block_on(self.fetch(operation, future))
    }

    pub fn secret(&self, name: &str) -> Result<String> {
        self.fetch_blocking(&format!("getSecret {}", name), self.secrets.get_secret(name))
    }

    pub fn region(&self) -> Result<String> {
        self.fetch_blocking("getRegion", self.region.region())
    }

    pub async fn object(&self, bucket: &str, key: &str) -> Result<String> {
        let operation = format!("s3://{}/{}", bucket, key);
        self.fetch(&operation, self.objects.get_object(bucket, key))
            .await
    }

    pub fn hostname(&self) -> Result<String> {
        self.system.hostname()
    }

    pub fn nameservers(&self) -> Result<Vec<String>> {
        self.system.nameservers()
    }

    pub fn num_cpu(&self) -> usize {
        self.system.num_cpu()
    }
}
