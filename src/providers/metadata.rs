// ABOUTME: Region discovery through AWS_REGION or the instance metadata service
// ABOUTME: The metadata lookup happens at most once per process and only on demand

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::error::{ProviderError, Result};
use super::{RegionSource, FETCH_TIMEOUT};

const METADATA_ENDPOINT: &str = "http://169.254.169.254";
const TOKEN_TTL_HEADER: &str = "X-aws-ec2-metadata-token-ttl-seconds";
const TOKEN_HEADER: &str = "X-aws-ec2-metadata-token";

pub struct MetadataRegion {
    configured: Option<String>,
    endpoint: String,
    client: Client,
    resolved: OnceCell<String>,
}

impl MetadataRegion {
    pub fn new(configured: Option<String>) -> Result<Self> {
        let client = Client::builder().timeout(FETCH_TIMEOUT).build()?;

        Ok(Self {
            configured: configured.filter(|r| !r.is_empty()),
            endpoint: METADATA_ENDPOINT.to_string(),
            client,
            resolved: OnceCell::new(),
        })
    }

    /// Point at a different metadata service base URL
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// IMDSv2 session token; `None` means fall back to IMDSv1.
    async fn session_token(&self) -> Option<String> {
        let response = self
            .client
            .put(format!("{}/latest/api/token", self.endpoint))
            .header(TOKEN_TTL_HEADER, "60")
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            debug!("IMDSv2 token request returned {}", response.status());
            return None;
        }
        response.text().await.ok()
    }

    async fn availability_zone(&self) -> Result<String> {
        let token = self.session_token().await;

        let mut request = self.client.get(format!(
            "{}/latest/meta-data/placement/availability-zone",
            self.endpoint
        ));
        if let Some(token) = token {
            request = request.header(TOKEN_HEADER, token);
        }

        let response = request.send().await.map_err(|e| {
            ProviderError::Metadata(format!("could not connect to metadata service: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(ProviderError::Metadata(format!(
                "availability zone request failed with status {}",
                response.status()
            )));
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl RegionSource for MetadataRegion {
    async fn region(&self) -> Result<String> {
        if let Some(region) = &self.configured {
            return Ok(region.clone());
        }

        let region = self
            .resolved
            .get_or_try_init(|| async {
                let zone = self.availability_zone().await?;
                let region = region_from_zone(&zone)?;
                info!("Resolved region {} from availability zone {}", region, zone.trim());
                Ok::<_, ProviderError>(region)
            })
            .await?;

        Ok(region.clone())
    }
}

/// `us-west-2a` -> `us-west-2`
pub fn region_from_zone(zone: &str) -> Result<String> {
    let zone = zone.trim();
    match zone.chars().last() {
        Some(c) if c.is_ascii_alphabetic() && zone.len() > 1 => {
            Ok(zone[..zone.len() - 1].to_string())
        }
        _ => Err(ProviderError::Metadata(format!(
            "unexpected availability zone {:?}",
            zone
        ))),
    }
}
