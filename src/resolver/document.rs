// ABOUTME: External variables document location parsing and loading
// ABOUTME: Fetches local or S3 content, renders it as a template, then parses it as YAML

use serde_json::Value as JsonValue;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use super::snapshot::VariableSnapshot;
use crate::engine::error::{EntrypointError, Result};
use crate::providers::Providers;
use crate::template::{TemplateContext, TemplateEngine};

const S3_SCHEME: &str = "s3://";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarsLocation {
    Local(PathBuf),
    ObjectStore { bucket: String, key: String },
}

impl VarsLocation {
    /// `s3://bucket/key[/more]` or a local path
    pub fn parse(location: &str) -> Result<Self> {
        let Some(path) = location.strip_prefix(S3_SCHEME) else {
            return Ok(VarsLocation::Local(PathBuf::from(location)));
        };

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.len() < 2 {
            return Err(EntrypointError::InvalidObjectPath(location.to_string()));
        }

        Ok(VarsLocation::ObjectStore {
            bucket: segments[0].to_string(),
            key: segments[1..].join("/"),
        })
    }
}

impl fmt::Display for VarsLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarsLocation::Local(path) => write!(f, "{}", path.display()),
            VarsLocation::ObjectStore { bucket, key } => write!(f, "{}{}/{}", S3_SCHEME, bucket, key),
        }
    }
}

/// Parsed vars document, always a mapping at the top level
#[derive(Debug, Clone, PartialEq)]
pub struct VarsDocument(JsonValue);

impl VarsDocument {
    /// Parse YAML text; an empty document is an empty mapping
    pub fn parse(location: &str, content: &str) -> Result<Self> {
        let parse_error = |message: String| EntrypointError::Parse {
            location: location.to_string(),
            message,
        };

        let yaml: serde_yaml::Value =
            serde_yaml::from_str(content).map_err(|e| parse_error(e.to_string()))?;

        match yaml {
            serde_yaml::Value::Null => Ok(Self(JsonValue::Object(serde_json::Map::new()))),
            serde_yaml::Value::Mapping(_) => serde_json::to_value(&yaml)
                .map(Self)
                .map_err(|e| parse_error(e.to_string())),
            _ => Err(parse_error("top level must be a mapping".to_string())),
        }
    }

    pub fn value(&self) -> &JsonValue {
        &self.0
    }

    pub fn into_value(self) -> JsonValue {
        self.0
    }
}

async fn fetch_raw(location: &VarsLocation, providers: &Providers) -> Result<String> {
    match location {
        VarsLocation::Local(path) => {
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| EntrypointError::VarsFileRead {
                    path: path.clone(),
                    source: e,
                })
        }
        VarsLocation::ObjectStore { bucket, key } => providers
            .object(bucket, key)
            .await
            .map_err(|e| EntrypointError::Fetch {
                what: location.to_string(),
                source: e,
            }),
    }
}

/// Fetch, render and parse the vars document.
///
/// The raw text is rendered with `EnvVars` only; `Vars` does not exist yet.
pub async fn load_vars_document(
    location: &VarsLocation,
    engine: Arc<TemplateEngine>,
    snapshot: &VariableSnapshot,
    providers: &Providers,
) -> Result<VarsDocument> {
    info!("Loading variables document from {}", location);
    let raw = fetch_raw(location, providers).await?;

    let name = location.to_string();
    let context = TemplateContext::new(snapshot.as_map().clone());
    let job = name.clone();
    let rendered = tokio::task::spawn_blocking(move || engine.render_str(&job, &raw, &context))
        .await?
        .map_err(|e| EntrypointError::Render {
            job: name.clone(),
            source: e,
        })?;

    VarsDocument::parse(&name, &rendered)
}
