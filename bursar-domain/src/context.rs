//! Treasury Context for Explicit Wallet/Asset Resolution
//!
//! Provides explicit context for every treasury operation:
//! - wallet: signing-key reference forwarded to the remote gateway
//! - address: the treasury's own account on the settlement ledger
//! - asset: the managed asset, when one is configured
//!
//! This is NEVER implicit in the internal model — there is no process-wide
//! "current wallet" or "current asset"; the context is resolved once per
//! request (or per automation tick) and passed down.

use crate::value_objects::{Address, AssetId, WalletKey};

/// Per-request treasury context.
///
/// The ledger and the distribution engine are pure functions of their
/// inputs; everything wallet- or asset-scoped arrives through this value.
#[derive(Debug, Clone)]
pub struct TreasuryContext {
    /// Signing-key reference for the treasury wallet.
    pub wallet: WalletKey,
    /// The treasury's account address (used for balance reads).
    pub address: Address,
    /// The managed asset, if one has been configured or deployed.
    pub asset: Option<AssetId>,
}

impl TreasuryContext {
    /// Create a context with no managed asset configured yet.
    pub fn new(wallet: WalletKey, address: Address) -> Self {
        Self {
            wallet,
            address,
            asset: None,
        }
    }

    /// Attach the managed asset.
    pub fn with_asset(mut self, asset: AssetId) -> Self {
        self.asset = Some(asset);
        self
    }

    /// The managed asset, if configured.
    pub fn managed_asset(&self) -> Option<&AssetId> {
        self.asset.as_ref()
    }
}
