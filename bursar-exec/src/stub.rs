//! Stub implementations for testing.
//!
//! These implementations simulate the external collaborators without
//! making real API calls: immediate settlement, injectable failures,
//! optional balance bookkeeping.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use bursar_domain::{Address, Amount, AssetId, WalletKey};

use crate::ports::{
    AdvisedAction, Advisor, AssetProfile, Deployment, GatewayError, HolderDirectory,
    LedgerGateway, Recommendation,
};

/// Balance map key for the native settlement asset.
const NATIVE_KEY: &str = "native";

// =============================================================================
// Stub Gateway
// =============================================================================

/// Stub remote operation gateway.
///
/// Settles every call immediately with a counter-generated signature.
/// Balances are only enforced once set explicitly; untracked assets settle
/// without bookkeeping.
pub struct StubGateway {
    /// Tracked balances by asset id (or the native key)
    balances: RwLock<HashMap<String, Decimal>>,
    /// Destination addresses whose transfers are rejected
    rejected: RwLock<HashSet<String>>,
    /// Whether to simulate an outage on the next call
    fail_next: RwLock<bool>,
    /// Signature counter
    sig_counter: AtomicU64,
    /// Deployed-asset counter
    mint_counter: AtomicU64,
}

impl StubGateway {
    /// Create a new stub gateway.
    pub fn new() -> Self {
        Self {
            balances: RwLock::new(HashMap::new()),
            rejected: RwLock::new(HashSet::new()),
            fail_next: RwLock::new(false),
            sig_counter: AtomicU64::new(0),
            mint_counter: AtomicU64::new(0),
        }
    }

    /// Track (and enforce) the native asset balance.
    pub fn set_native_balance(&self, amount: Decimal) {
        self.balances
            .write()
            .unwrap()
            .insert(NATIVE_KEY.to_string(), amount);
    }

    /// Track (and enforce) a managed asset balance.
    pub fn set_asset_balance(&self, asset: &AssetId, amount: Decimal) {
        self.balances
            .write()
            .unwrap()
            .insert(asset.as_str().to_string(), amount);
    }

    /// Reject all transfers to an address.
    pub fn reject_address(&self, address: &str) {
        self.rejected.write().unwrap().insert(address.to_string());
    }

    /// Configure the next call to fail with an outage.
    pub fn set_fail_next(&self, fail: bool) {
        *self.fail_next.write().unwrap() = fail;
    }

    fn should_fail(&self) -> bool {
        let mut fail_next = self.fail_next.write().unwrap();
        let fail = *fail_next;
        *fail_next = false; // Reset after check
        fail
    }

    fn next_signature(&self) -> String {
        format!("STUBSIG{}", self.sig_counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn balance_key(asset: Option<&AssetId>) -> String {
        asset
            .map(|a| a.as_str().to_string())
            .unwrap_or_else(|| NATIVE_KEY.to_string())
    }

    /// Debit a tracked balance; untracked balances are not enforced.
    fn debit(&self, key: &str, amount: Decimal) -> Result<(), GatewayError> {
        let mut balances = self.balances.write().unwrap();
        if let Some(balance) = balances.get_mut(key) {
            if *balance < amount {
                return Err(GatewayError::InsufficientFunds(format!(
                    "balance {} is below requested {}",
                    balance, amount
                )));
            }
            *balance -= amount;
        }
        Ok(())
    }
}

impl Default for StubGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerGateway for StubGateway {
    async fn transfer(
        &self,
        _wallet: &WalletKey,
        destination: &Address,
        asset: Option<&AssetId>,
        amount: Amount,
    ) -> Result<String, GatewayError> {
        if self.should_fail() {
            return Err(GatewayError::Unavailable(
                "simulated gateway outage".to_string(),
            ));
        }
        if self.rejected.read().unwrap().contains(destination.as_str()) {
            return Err(GatewayError::Rejected(format!(
                "transfer rejected for {}",
                destination
            )));
        }
        self.debit(&Self::balance_key(asset), amount.as_decimal())?;
        Ok(self.next_signature())
    }

    async fn burn(
        &self,
        _wallet: &WalletKey,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<String, GatewayError> {
        if self.should_fail() {
            return Err(GatewayError::Unavailable(
                "simulated gateway outage".to_string(),
            ));
        }
        self.debit(asset.as_str(), amount.as_decimal())?;
        Ok(self.next_signature())
    }

    async fn buy(
        &self,
        _wallet: &WalletKey,
        _asset: &AssetId,
        native_amount: Amount,
    ) -> Result<String, GatewayError> {
        if self.should_fail() {
            return Err(GatewayError::Unavailable(
                "simulated gateway outage".to_string(),
            ));
        }
        self.debit(NATIVE_KEY, native_amount.as_decimal())?;
        Ok(self.next_signature())
    }

    async fn claim(&self, _wallet: &WalletKey, _asset: &AssetId) -> Result<String, GatewayError> {
        if self.should_fail() {
            return Err(GatewayError::Unavailable(
                "simulated gateway outage".to_string(),
            ));
        }
        Ok(self.next_signature())
    }

    async fn deploy(
        &self,
        _wallet: &WalletKey,
        _profile: &AssetProfile,
    ) -> Result<Deployment, GatewayError> {
        if self.should_fail() {
            return Err(GatewayError::Unavailable(
                "simulated gateway outage".to_string(),
            ));
        }
        let n = self.mint_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let asset = AssetId::new(format!("STUBMINT{}", n))
            .map_err(|e| GatewayError::Rejected(e.to_string()))?;
        Ok(Deployment {
            asset,
            signature: self.next_signature(),
        })
    }

    async fn balance(
        &self,
        _address: &Address,
        asset: Option<&AssetId>,
    ) -> Result<Decimal, GatewayError> {
        if self.should_fail() {
            return Err(GatewayError::Unavailable(
                "simulated gateway outage".to_string(),
            ));
        }
        let balances = self.balances.read().unwrap();
        Ok(balances
            .get(&Self::balance_key(asset))
            .copied()
            .unwrap_or(Decimal::ZERO))
    }

    async fn health_check(&self) -> Result<(), GatewayError> {
        if self.should_fail() {
            return Err(GatewayError::Unavailable(
                "simulated gateway outage".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Stub Holder Directory
// =============================================================================

/// Stub holder directory with preset holder lists.
pub struct StubHolderDirectory {
    holders: RwLock<HashMap<String, Vec<(Address, Decimal)>>>,
    fail_next: RwLock<bool>,
}

impl StubHolderDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self {
            holders: RwLock::new(HashMap::new()),
            fail_next: RwLock::new(false),
        }
    }

    /// Preset the holder list for an asset.
    pub fn set_holders(&self, asset: &AssetId, holders: Vec<(Address, Decimal)>) {
        self.holders
            .write()
            .unwrap()
            .insert(asset.as_str().to_string(), holders);
    }

    /// Configure the next call to fail.
    pub fn set_fail_next(&self, fail: bool) {
        *self.fail_next.write().unwrap() = fail;
    }

    fn should_fail(&self) -> bool {
        let mut fail_next = self.fail_next.write().unwrap();
        let fail = *fail_next;
        *fail_next = false;
        fail
    }
}

impl Default for StubHolderDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HolderDirectory for StubHolderDirectory {
    async fn list_holders(&self, asset: &AssetId) -> Result<Vec<(Address, Decimal)>, GatewayError> {
        if self.should_fail() {
            return Err(GatewayError::Unavailable(
                "simulated directory outage".to_string(),
            ));
        }
        let holders = self.holders.read().unwrap();
        Ok(holders.get(asset.as_str()).cloned().unwrap_or_default())
    }
}

// =============================================================================
// Stub Advisor
// =============================================================================

/// Stub advisor returning a configurable recommendation.
pub struct StubAdvisor {
    recommendation: RwLock<Recommendation>,
    fail_next: RwLock<bool>,
}

impl StubAdvisor {
    /// Create an advisor that recommends holding.
    pub fn new() -> Self {
        Self {
            recommendation: RwLock::new(Recommendation {
                action: AdvisedAction::Hold,
                amount: None,
                rationale: "no signal".to_string(),
            }),
            fail_next: RwLock::new(false),
        }
    }

    /// Set the recommendation returned by the next calls.
    pub fn set_recommendation(&self, recommendation: Recommendation) {
        *self.recommendation.write().unwrap() = recommendation;
    }

    /// Configure the next call to fail.
    pub fn set_fail_next(&self, fail: bool) {
        *self.fail_next.write().unwrap() = fail;
    }

    fn should_fail(&self) -> bool {
        let mut fail_next = self.fail_next.write().unwrap();
        let fail = *fail_next;
        *fail_next = false;
        fail
    }
}

impl Default for StubAdvisor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Advisor for StubAdvisor {
    async fn recommend(&self, _asset: Option<&AssetId>) -> Result<Recommendation, GatewayError> {
        if self.should_fail() {
            return Err(GatewayError::Unavailable(
                "simulated advisory outage".to_string(),
            ));
        }
        Ok(self.recommendation.read().unwrap().clone())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn wallet() -> WalletKey {
        WalletKey::new("stub-wallet").unwrap()
    }

    #[tokio::test]
    async fn test_stub_transfer_settles_with_signature() {
        let gateway = StubGateway::new();
        let signature = gateway
            .transfer(
                &wallet(),
                &Address::new("A1").unwrap(),
                None,
                Amount::new(dec!(1)).unwrap(),
            )
            .await
            .unwrap();
        assert!(signature.starts_with("STUBSIG"));
    }

    #[tokio::test]
    async fn test_stub_transfer_rejected_address() {
        let gateway = StubGateway::new();
        gateway.reject_address("A1");

        let result = gateway
            .transfer(
                &wallet(),
                &Address::new("A1").unwrap(),
                None,
                Amount::new(dec!(1)).unwrap(),
            )
            .await;
        assert!(matches!(result, Err(GatewayError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_stub_fail_next_resets() {
        let gateway = StubGateway::new();
        gateway.set_fail_next(true);

        let result = gateway.health_check().await;
        assert!(matches!(result, Err(GatewayError::Unavailable(_))));

        // Next call succeeds.
        assert!(gateway.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_stub_tracked_balance_is_enforced_and_debited() {
        let gateway = StubGateway::new();
        gateway.set_native_balance(dec!(1.5));

        let first = gateway
            .transfer(
                &wallet(),
                &Address::new("A1").unwrap(),
                None,
                Amount::new(dec!(1)).unwrap(),
            )
            .await;
        assert!(first.is_ok());

        let second = gateway
            .transfer(
                &wallet(),
                &Address::new("B2").unwrap(),
                None,
                Amount::new(dec!(1)).unwrap(),
            )
            .await;
        assert!(matches!(second, Err(GatewayError::InsufficientFunds(_))));

        let remaining = gateway
            .balance(&Address::new("TREAS1").unwrap(), None)
            .await
            .unwrap();
        assert_eq!(remaining, dec!(0.5));
    }

    #[tokio::test]
    async fn test_stub_deploy_generates_asset() {
        let gateway = StubGateway::new();
        let profile = AssetProfile {
            name: "Test Coin".to_string(),
            symbol: "TEST".to_string(),
            metadata_uri: None,
            initial_buy: None,
        };

        let deployment = gateway.deploy(&wallet(), &profile).await.unwrap();
        assert!(deployment.asset.as_str().starts_with("STUBMINT"));
    }

    #[tokio::test]
    async fn test_stub_directory_preset_holders() {
        let directory = StubHolderDirectory::new();
        let asset = AssetId::new("MINT1").unwrap();
        directory.set_holders(
            &asset,
            vec![(Address::new("A1").unwrap(), dec!(70))],
        );

        let holders = directory.list_holders(&asset).await.unwrap();
        assert_eq!(holders.len(), 1);
        assert_eq!(holders[0].1, dec!(70));

        let empty = directory
            .list_holders(&AssetId::new("OTHER").unwrap())
            .await
            .unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_stub_advisor_configurable() {
        let advisor = StubAdvisor::new();
        let default = advisor.recommend(None).await.unwrap();
        assert_eq!(default.action, AdvisedAction::Hold);

        advisor.set_recommendation(Recommendation {
            action: AdvisedAction::Burn,
            amount: Some(Amount::new(dec!(1000)).unwrap()),
            rationale: "supply overhang".to_string(),
        });
        let updated = advisor.recommend(None).await.unwrap();
        assert_eq!(updated.action, AdvisedAction::Burn);
    }
}
