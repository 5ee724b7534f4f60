//! Holder Service REST Client
//!
//! Implements the holder directory port over a JSON/HTTP holder service.
//! The service replies with the raw `[{address, balance}]` list; share
//! percentages are computed downstream by the snapshot service.

use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

use async_trait::async_trait;
use bursar_domain::{Address, AssetId};
use bursar_exec::{GatewayError, HolderDirectory};

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct HolderReply {
    address: String,
    balance: Decimal,
}

/// Holder service REST client implementing the holder directory port.
pub struct HolderServiceClient {
    /// HTTP client
    client: Client,
    /// Service base URL
    base_url: String,
}

impl HolderServiceClient {
    /// Create a new holder service client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl HolderDirectory for HolderServiceClient {
    async fn list_holders(&self, asset: &AssetId) -> Result<Vec<(Address, Decimal)>, GatewayError> {
        let url = format!("{}/holders?assetId={}", self.base_url, asset.as_str());
        debug!(%url, "Holder service request");

        let response = timeout(
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
            self.client.get(&url).send(),
        )
        .await
        .map_err(|_| GatewayError::Timeout)?
        .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Unavailable(format!(
                "holder service HTTP {}",
                status
            )));
        }

        let replies = response
            .json::<Vec<HolderReply>>()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("invalid holder reply: {}", e)))?;

        let mut holders = Vec::with_capacity(replies.len());
        for reply in replies {
            let address = Address::new(reply.address).map_err(|e| {
                GatewayError::Unavailable(format!("holder service returned invalid address: {}", e))
            })?;
            holders.push((address, reply.balance));
        }
        Ok(holders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_holder_reply_wire_shape() {
        let replies: Vec<HolderReply> = serde_json::from_str(
            r#"[{"address": "A1", "balance": "70"}, {"address": "B2", "balance": "30"}]"#,
        )
        .unwrap();

        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].address, "A1");
        assert_eq!(replies[1].balance, dec!(30));
    }
}
