//! Wallet Service REST Client
//!
//! Implements the remote operation gateway port over a JSON/HTTP wallet
//! service. Every call performs one operation against the ledger network
//! and replies with `{success, signature?, error?}`; balances reply with
//! `{balance}`. The signing key is forwarded opaquely per call.

use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

use async_trait::async_trait;
use bursar_domain::{Address, Amount, AssetId, WalletKey};
use bursar_exec::{AssetProfile, Deployment, GatewayError, LedgerGateway};

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TransferRequest<'a> {
    source_key: &'a str,
    destination_address: &'a str,
    asset_id: Option<&'a str>,
    amount: Amount,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BurnRequest<'a> {
    owner_key: &'a str,
    asset_id: &'a str,
    amount: Amount,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BuyRequest<'a> {
    buyer_key: &'a str,
    asset_id: &'a str,
    native_amount: Amount,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClaimRequest<'a> {
    owner_key: &'a str,
    asset_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeployRequest<'a> {
    owner_key: &'a str,
    name: &'a str,
    symbol: &'a str,
    metadata_uri: Option<&'a str>,
    initial_buy: Option<Amount>,
}

/// Reply shape shared by all mutating wallet-service endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationReply {
    success: bool,
    #[serde(default)]
    signature: Option<String>,
    #[serde(default)]
    asset_id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl OperationReply {
    fn into_signature(self) -> Result<String, GatewayError> {
        if self.success {
            self.signature.ok_or_else(|| {
                GatewayError::Rejected("wallet service reply missing signature".to_string())
            })
        } else {
            Err(classify_failure(self.error))
        }
    }
}

#[derive(Debug, Deserialize)]
struct BalanceReply {
    balance: Decimal,
}

/// Classify a wallet-service failure string. The wire contract carries no
/// error codes, so insufficient-funds failures are recognized by message.
fn classify_failure(error: Option<String>) -> GatewayError {
    let message = error.unwrap_or_else(|| "operation failed".to_string());
    if message.to_lowercase().contains("insufficient") {
        GatewayError::InsufficientFunds(message)
    } else {
        GatewayError::Rejected(message)
    }
}

// =============================================================================
// Wallet Service Client
// =============================================================================

/// Wallet service REST client implementing the ledger gateway port.
pub struct WalletServiceClient {
    /// HTTP client
    client: Client,
    /// Service base URL
    base_url: String,
}

impl WalletServiceClient {
    /// Create a new wallet service client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Send a POST and decode the standard operation reply.
    async fn post_operation<B: Serialize + Sync>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<OperationReply, GatewayError> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(%url, "Wallet service request");

        let response = timeout(
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
            self.client.post(&url).json(body).send(),
        )
        .await
        .map_err(|_| GatewayError::Timeout)?
        .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Unavailable(format!(
                "wallet service HTTP {}: {}",
                status, body
            )));
        }

        response
            .json::<OperationReply>()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("invalid wallet service reply: {}", e)))
    }
}

#[async_trait]
impl LedgerGateway for WalletServiceClient {
    async fn transfer(
        &self,
        wallet: &WalletKey,
        destination: &Address,
        asset: Option<&AssetId>,
        amount: Amount,
    ) -> Result<String, GatewayError> {
        let request = TransferRequest {
            source_key: wallet.expose(),
            destination_address: destination.as_str(),
            asset_id: asset.map(|a| a.as_str()),
            amount,
        };
        self.post_operation("/transfer", &request)
            .await?
            .into_signature()
    }

    async fn burn(
        &self,
        wallet: &WalletKey,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<String, GatewayError> {
        let request = BurnRequest {
            owner_key: wallet.expose(),
            asset_id: asset.as_str(),
            amount,
        };
        self.post_operation("/burn", &request)
            .await?
            .into_signature()
    }

    async fn buy(
        &self,
        wallet: &WalletKey,
        asset: &AssetId,
        native_amount: Amount,
    ) -> Result<String, GatewayError> {
        let request = BuyRequest {
            buyer_key: wallet.expose(),
            asset_id: asset.as_str(),
            native_amount,
        };
        self.post_operation("/buy", &request)
            .await?
            .into_signature()
    }

    async fn claim(&self, wallet: &WalletKey, asset: &AssetId) -> Result<String, GatewayError> {
        let request = ClaimRequest {
            owner_key: wallet.expose(),
            asset_id: asset.as_str(),
        };
        self.post_operation("/claim", &request)
            .await?
            .into_signature()
    }

    async fn deploy(
        &self,
        wallet: &WalletKey,
        profile: &AssetProfile,
    ) -> Result<Deployment, GatewayError> {
        let request = DeployRequest {
            owner_key: wallet.expose(),
            name: &profile.name,
            symbol: &profile.symbol,
            metadata_uri: profile.metadata_uri.as_deref(),
            initial_buy: profile.initial_buy,
        };
        let reply = self.post_operation("/deploy", &request).await?;

        if !reply.success {
            return Err(classify_failure(reply.error));
        }
        let asset = reply
            .asset_id
            .ok_or_else(|| {
                GatewayError::Rejected("wallet service reply missing asset id".to_string())
            })
            .and_then(|id| {
                AssetId::new(id).map_err(|e| {
                    GatewayError::Rejected(format!("wallet service returned invalid asset id: {}", e))
                })
            })?;
        let signature = reply.signature.ok_or_else(|| {
            GatewayError::Rejected("wallet service reply missing signature".to_string())
        })?;

        Ok(Deployment { asset, signature })
    }

    async fn balance(
        &self,
        address: &Address,
        asset: Option<&AssetId>,
    ) -> Result<Decimal, GatewayError> {
        let mut url = format!("{}/balance?address={}", self.base_url, address.as_str());
        if let Some(asset) = asset {
            url.push_str(&format!("&assetId={}", asset.as_str()));
        }

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
                "wallet service HTTP {}",
                status
            )));
        }

        let reply = response
            .json::<BalanceReply>()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("invalid balance reply: {}", e)))?;
        Ok(reply.balance)
    }

    async fn health_check(&self) -> Result<(), GatewayError> {
        let url = format!("{}/health", self.base_url);
        let response = timeout(
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
            self.client.get(&url).send(),
        )
        .await
        .map_err(|_| GatewayError::Timeout)?
        .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(GatewayError::Unavailable(format!(
                "wallet service HTTP {}",
                response.status()
            )))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
