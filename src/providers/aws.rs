// ABOUTME: AWS-backed provider clients for Secrets Manager and S3
// ABOUTME: The SDK configuration is loaded lazily with the discovered region

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::error::{ProviderError, Result};
use super::{ObjectStore, RegionSource, SecretStore};

/// Shared SDK configuration for every AWS client in the process
pub struct AwsSession {
    region: Arc<dyn RegionSource>,
    config: OnceCell<SdkConfig>,
}

impl AwsSession {
    pub fn new(region: Arc<dyn RegionSource>) -> Self {
        Self {
            region,
            config: OnceCell::new(),
        }
    }

    async fn config(&self) -> Result<&SdkConfig> {
        self.config
            .get_or_try_init(|| async {
                let region = self.region.region().await?;
                info!("Loading AWS configuration for region {}", region);
                let config = aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(region))
                    .load()
                    .await;
                Ok::<_, ProviderError>(config)
            })
            .await
    }
}

pub struct SecretsManagerStore {
    session: Arc<AwsSession>,
    client: OnceCell<aws_sdk_secretsmanager::Client>,
}

impl SecretsManagerStore {
    pub fn new(session: Arc<AwsSession>) -> Self {
        Self {
            session,
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> Result<&aws_sdk_secretsmanager::Client> {
        self.client
            .get_or_try_init(|| async {
                let config = self.session.config().await?;
                Ok::<_, ProviderError>(aws_sdk_secretsmanager::Client::new(config))
            })
            .await
    }
}

#[async_trait]
impl SecretStore for SecretsManagerStore {
    async fn get_secret(&self, name: &str) -> Result<String> {
        debug!("Fetching secret {}", name);
        let output = self
            .client()
            .await?
            .get_secret_value()
            .secret_id(name)
            .send()
            .await
            .map_err(|e| ProviderError::Secret {
                name: name.to_string(),
                message: aws_sdk_secretsmanager::error::DisplayErrorContext(&e).to_string(),
            })?;

        output
            .secret_string()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Secret {
                name: name.to_string(),
                message: "secret has no string value".to_string(),
            })
    }
}

pub struct S3ObjectStore {
    session: Arc<AwsSession>,
    client: OnceCell<aws_sdk_s3::Client>,
}

impl S3ObjectStore {
    pub fn new(session: Arc<AwsSession>) -> Self {
        Self {
            session,
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> Result<&aws_sdk_s3::Client> {
        self.client
            .get_or_try_init(|| async {
                let config = self.session.config().await?;
                Ok::<_, ProviderError>(aws_sdk_s3::Client::new(config))
            })
            .await
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<String> {
        let object_error = |message: String| ProviderError::Object {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message,
        };

        info!("Downloading s3://{}/{}", bucket, key);
        let output = self
            .client()
            .await?
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| object_error(aws_sdk_s3::error::DisplayErrorContext(&e).to_string()))?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| object_error(e.to_string()))?
            .into_bytes();

        String::from_utf8(bytes.to_vec()).map_err(|e| object_error(e.to_string()))
    }
}
