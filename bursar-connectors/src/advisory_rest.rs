//! Advisory Service REST Client
//!
//! Implements the decision advisor port over a JSON/HTTP advisory service.
//! The treasury consumes only the `{action, amount?, rationale}` tuple; how
//! the service weighs sentiment and market inputs is opaque.

use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

use async_trait::async_trait;
use bursar_domain::AssetId;
use bursar_exec::{Advisor, GatewayError, Recommendation};

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecommendRequest<'a> {
    asset_id: Option<&'a str>,
}

/// Advisory service REST client implementing the advisor port.
pub struct AdvisoryServiceClient {
    /// HTTP client
    client: Client,
    /// Service base URL
    base_url: String,
}

impl AdvisoryServiceClient {
    /// Create a new advisory service client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Advisor for AdvisoryServiceClient {
    async fn recommend(&self, asset: Option<&AssetId>) -> Result<Recommendation, GatewayError> {
        let url = format!("{}/recommend", self.base_url);
        debug!(%url, "Advisory service request");

        let request = RecommendRequest {
            asset_id: asset.map(|a| a.as_str()),
        };

        let response = timeout(
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
            self.client.post(&url).json(&request).send(),
        )
        .await
        .map_err(|_| GatewayError::Timeout)?
        .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Unavailable(format!(
                "advisory service HTTP {}",
                status
            )));
        }

        response
            .json::<Recommendation>()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("invalid advisory reply: {}", e)))
    }
}
