//! Execution layer port definitions.
//!
//! Ports define the interfaces for the external collaborators: the remote
//! operation gateway (wallet service), the holder directory, and the
//! decision advisor. Adapters implement these ports for specific services
//! (HTTP wallet service, stub, etc.). None of them hold internal state the
//! treasury cares about; they are single-call capabilities.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bursar_domain::{Address, Amount, AssetId, WalletKey};

// =============================================================================
// Gateway Errors
// =============================================================================

/// Errors returned by the external collaborator ports.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Service unreachable (network failure, non-2xx transport error)
    #[error("gateway unreachable: {0}")]
    Unavailable(String),

    /// The ledger network rejected the operation
    #[error("operation rejected: {0}")]
    Rejected(String),

    /// The treasury wallet holds too little to cover the operation
    #[error("insufficient treasury funds: {0}")]
    InsufficientFunds(String),

    /// The call exceeded its bounded wait
    #[error("gateway call timed out")]
    Timeout,
}

// =============================================================================
// Remote Operation Gateway Port
// =============================================================================

/// Metadata for deploying the managed asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetProfile {
    /// Asset display name
    pub name: String,
    /// Asset ticker symbol
    pub symbol: String,
    /// Off-ledger metadata URI
    pub metadata_uri: Option<String>,
    /// Optional initial buy placed atomically with the deployment
    pub initial_buy: Option<Amount>,
}

/// Result of a successful asset deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    /// The newly created asset's on-ledger identifier
    pub asset: AssetId,
    /// Settlement signature of the deployment
    pub signature: String,
}

/// Port for ledger-network operations.
///
/// Every call performs exactly one operation against the ledger network and
/// returns a settlement signature or a failure. The wallet key is passed
/// explicitly per call; there is no ambient signer.
///
/// Implementations:
/// - `StubGateway` - For testing (immediate settlement, injectable failures)
/// - `WalletServiceClient` - JSON/HTTP wallet service (bursar-connectors)
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Transfer `amount` of the native asset (`asset` = None) or a managed
    /// asset to `destination`. Returns the settlement signature.
    async fn transfer(
        &self,
        wallet: &WalletKey,
        destination: &Address,
        asset: Option<&AssetId>,
        amount: Amount,
    ) -> Result<String, GatewayError>;

    /// Burn `amount` of the managed asset held by the wallet.
    async fn burn(
        &self,
        wallet: &WalletKey,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<String, GatewayError>;

    /// Spend `native_amount` of the native asset buying the managed asset.
    async fn buy(
        &self,
        wallet: &WalletKey,
        asset: &AssetId,
        native_amount: Amount,
    ) -> Result<String, GatewayError>;

    /// Claim accrued issuer rewards for the managed asset.
    async fn claim(&self, wallet: &WalletKey, asset: &AssetId) -> Result<String, GatewayError>;

    /// Deploy the managed asset described by `profile`.
    async fn deploy(
        &self,
        wallet: &WalletKey,
        profile: &AssetProfile,
    ) -> Result<Deployment, GatewayError>;

    /// Live balance read for an account. Always authoritative over the
    /// treasury balance cache.
    async fn balance(
        &self,
        address: &Address,
        asset: Option<&AssetId>,
    ) -> Result<Decimal, GatewayError>;

    /// Check if the gateway is healthy/connected.
    async fn health_check(&self) -> Result<(), GatewayError>;
}

// =============================================================================
// Holder Directory Port
// =============================================================================

/// Port for reading the current holder list of an asset.
///
/// Implementations:
/// - `StubHolderDirectory` - For testing (preset holder lists)
/// - `HolderServiceClient` - JSON/HTTP holder service (bursar-connectors)
#[async_trait]
pub trait HolderDirectory: Send + Sync {
    /// The holder list `(address, balance)` for an asset at the time of
    /// call. Share percentages are computed by the snapshot service, not
    /// the directory.
    async fn list_holders(&self, asset: &AssetId) -> Result<Vec<(Address, Decimal)>, GatewayError>;
}

// =============================================================================
// Decision Advisor Port
// =============================================================================

/// Action proposed by the advisory service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisedAction {
    /// No action; rationale is recorded as commentary
    Hold,
    /// Burn supply
    Burn,
    /// Buy back supply with the native asset
    Buyback,
    /// Claim issuer rewards
    ClaimRewards,
    /// Distribute holdings to current holders
    Distribute,
}

/// A recommendation consumed by the automation cycle: action, optional
/// amount, and the advisor's rationale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    /// Proposed action
    pub action: AdvisedAction,
    /// Amount the action should move, absent for Hold/ClaimRewards
    pub amount: Option<Amount>,
    /// Free-text rationale, recorded in the audit trail
    pub rationale: String,
}

/// Port for the decision-advisory service. The treasury only consumes its
/// output; how the advice is produced (sentiment, market data) is opaque.
#[async_trait]
pub trait Advisor: Send + Sync {
    /// Propose the next treasury action for the managed asset.
    async fn recommend(&self, asset: Option<&AssetId>) -> Result<Recommendation, GatewayError>;
}

// =============================================================================
// Tests
// =============================================================================
