// ABOUTME: Error types for provider lookups (secrets, object storage, metadata, system)
// ABOUTME: Every variant is a fetch-class failure from the caller's point of view

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("secret {name}: {message}")]
    Secret { name: String, message: String },

    #[error("s3://{bucket}/{key}: {message}")]
    Object {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("instance metadata: {0}")]
    Metadata(String),

    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: String,
        timeout: Duration,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ProviderError>;
