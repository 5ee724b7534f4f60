//! Single-call treasury operations.
//!
//! Deploy, burn, buyback, and reward claim all follow the same three-step
//! shape: open a record plus audit entry in `pending`, invoke the gateway
//! under a bounded wait, close with `success`/`failed` based on the result.
//! They share the operation ledger's transition rules exactly; there are no
//! bespoke statuses per operation kind. Also owns the treasury balance
//! refresh, since the gateway's live read is the only authoritative source.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::time::timeout;
use tracing::{info, warn};

use bursar_domain::{
    Amount, AssetId, OperationId, OperationKind, OperationRecord, OperationStatus,
    TreasuryBalances, TreasuryContext,
};
use bursar_store::Store;

use crate::error::{ExecError, ExecResult};
use crate::ledger::{OperationLedger, OperationOutcome};
use crate::ports::{AssetProfile, GatewayError, LedgerGateway};

// =============================================================================
// Operation Report
// =============================================================================

/// Caller-facing summary of a finished single-call operation.
#[derive(Debug, Clone)]
pub struct OperationReport {
    /// The operation record's id
    pub id: OperationId,
    /// Terminal status (`Success` or `Failed`)
    pub status: OperationStatus,
    /// The asset concerned (for deployments, the newly created asset)
    pub asset_id: Option<AssetId>,
    /// Settlement signature, present on success
    pub signature: Option<String>,
    /// Gateway error string, present on failure
    pub error: Option<String>,
}

impl OperationReport {
    fn from_record(record: &OperationRecord) -> Self {
        Self {
            id: record.id,
            status: record.status,
            asset_id: record.asset_id.clone(),
            signature: record.signature.clone(),
            error: record.error.clone(),
        }
    }

    /// Whether the operation settled.
    pub fn is_success(&self) -> bool {
        self.status == OperationStatus::Success
    }
}

// =============================================================================
// Treasury Ops
// =============================================================================

/// Executes single-call operations against the gateway and records them
/// through the operation ledger.
pub struct TreasuryOps<G: LedgerGateway, S: Store> {
    gateway: Arc<G>,
    ledger: OperationLedger<S>,
    store: Arc<S>,
    call_timeout: Duration,
}

impl<G: LedgerGateway, S: Store> TreasuryOps<G, S> {
    /// Create the single-call executor.
    pub fn new(
        gateway: Arc<G>,
        ledger: OperationLedger<S>,
        store: Arc<S>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            gateway,
            ledger,
            store,
            call_timeout,
        }
    }

    /// Deploy the managed asset. On success the record carries the newly
    /// created asset id alongside the settlement signature.
    pub async fn deploy(
        &self,
        ctx: &TreasuryContext,
        profile: AssetProfile,
        reason: Option<String>,
    ) -> ExecResult<OperationReport> {
        let quantity = profile
            .initial_buy
            .map(|a| a.as_decimal())
            .unwrap_or(Decimal::ZERO);
        let id = self
            .ledger
            .open(OperationKind::Deployment, None, quantity, reason)
            .await?;

        let result = self.bounded(self.gateway.deploy(&ctx.wallet, &profile)).await;
        let record = match result {
            Ok(deployment) => {
                info!(
                    operation_id = %id,
                    asset = %deployment.asset,
                    "Asset deployed"
                );
                self.ledger
                    .close(
                        id,
                        OperationOutcome::Deployed {
                            asset: deployment.asset,
                            signature: deployment.signature,
                        },
                    )
                    .await?
            }
            Err(e) => self.fail(id, e).await?,
        };
        Ok(OperationReport::from_record(&record))
    }

    /// Burn managed asset supply held by the treasury.
    pub async fn burn(
        &self,
        ctx: &TreasuryContext,
        asset: AssetId,
        amount: Amount,
        reason: Option<String>,
    ) -> ExecResult<OperationReport> {
        let id = self
            .ledger
            .open(
                OperationKind::Burn,
                Some(asset.clone()),
                amount.as_decimal(),
                reason,
            )
            .await?;

        let result = self
            .bounded(self.gateway.burn(&ctx.wallet, &asset, amount))
            .await;
        self.settle(id, result).await
    }

    /// Buy back managed asset supply, spending the native asset.
    pub async fn buyback(
        &self,
        ctx: &TreasuryContext,
        asset: AssetId,
        native_amount: Amount,
        reason: Option<String>,
    ) -> ExecResult<OperationReport> {
        let id = self
            .ledger
            .open(
                OperationKind::Buyback,
                Some(asset.clone()),
                native_amount.as_decimal(),
                reason,
            )
            .await?;

        let result = self
            .bounded(self.gateway.buy(&ctx.wallet, &asset, native_amount))
            .await;
        self.settle(id, result).await
    }

    /// Claim accrued issuer rewards for the managed asset. The claimed
    /// quantity is not known up front, so the record's quantity is zero.
    pub async fn claim(
        &self,
        ctx: &TreasuryContext,
        asset: AssetId,
        reason: Option<String>,
    ) -> ExecResult<OperationReport> {
        let id = self
            .ledger
            .open(
                OperationKind::RewardClaim,
                Some(asset.clone()),
                Decimal::ZERO,
                reason,
            )
            .await?;

        let result = self.bounded(self.gateway.claim(&ctx.wallet, &asset)).await;
        self.settle(id, result).await
    }

    /// Re-read treasury balances from the gateway and replace the cache.
    ///
    /// # Errors
    /// Returns `ExecError::UpstreamUnavailable` if the gateway cannot be
    /// read; the stale cache is left untouched in that case.
    pub async fn refresh_balances(&self, ctx: &TreasuryContext) -> ExecResult<TreasuryBalances> {
        let native = self
            .bounded(self.gateway.balance(&ctx.address, None))
            .await
            .map_err(|e| ExecError::UpstreamUnavailable(e.to_string()))?;

        let asset = match ctx.managed_asset() {
            Some(asset_id) => self
                .bounded(self.gateway.balance(&ctx.address, Some(asset_id)))
                .await
                .map_err(|e| ExecError::UpstreamUnavailable(e.to_string()))?,
            None => Decimal::ZERO,
        };

        let balances = TreasuryBalances::new(native, asset);
        self.store.balances().put(balances).await?;
        info!(native = %balances.native, asset = %balances.asset, "Treasury balances refreshed");
        Ok(balances)
    }

    /// Close the operation from the gateway result.
    async fn settle(
        &self,
        id: OperationId,
        result: Result<String, GatewayError>,
    ) -> ExecResult<OperationReport> {
        let record = match result {
            Ok(signature) => {
                self.ledger
                    .close(id, OperationOutcome::Success { signature })
                    .await?
            }
            Err(e) => self.fail(id, e).await?,
        };
        Ok(OperationReport::from_record(&record))
    }

    async fn fail(&self, id: OperationId, error: GatewayError) -> ExecResult<OperationRecord> {
        warn!(operation_id = %id, error = %error, "Gateway call failed");
        self.ledger
            .close(
                id,
                OperationOutcome::Failure {
                    error: error.to_string(),
                },
            )
            .await
    }

    /// Bound a gateway call so a stuck upstream cannot stall the caller.
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, GatewayError>>,
    ) -> Result<T, GatewayError> {
        match timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::StubGateway;
    use bursar_domain::{Address, WalletKey};
    use bursar_store::MemoryStore;
    use rust_decimal_macros::dec;

    fn context() -> TreasuryContext {
        TreasuryContext::new(
            WalletKey::new("test-wallet-key").unwrap(),
            Address::new("TREAS1").unwrap(),
        )
    }

    fn asset() -> AssetId {
        AssetId::new("MINT1").unwrap()
    }

    fn ops_with(
        gateway: Arc<StubGateway>,
    ) -> (TreasuryOps<StubGateway, MemoryStore>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let ledger = OperationLedger::new(store.clone());
        let ops = TreasuryOps::new(gateway, ledger, store.clone(), Duration::from_secs(5));
        (ops, store)
    }

    #[tokio::test]
    async fn test_burn_success_attaches_signature_and_closes_audit() {
        let gateway = Arc::new(StubGateway::new());
        let (ops, store) = ops_with(gateway);

        let report = ops
            .burn(
                &context(),
                asset(),
                Amount::new(dec!(1000)).unwrap(),
                Some("supply reduction".to_string()),
            )
            .await
            .unwrap();

        assert!(report.is_success());
        assert!(report.signature.as_deref().unwrap().starts_with("STUBSIG"));
        assert!(report.error.is_none());

        let record = store
            .operations()
            .find_by_id(report.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, OperationStatus::Success);
        assert_eq!(record.quantity, dec!(1000));

        let entry = store
            .audit()
            .find_by_operation(report.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.status, OperationStatus::Success);
    }

    #[tokio::test]
    async fn test_burn_gateway_outage_closes_failed() {
        let gateway = Arc::new(StubGateway::new());
        gateway.set_fail_next(true);
        let (ops, store) = ops_with(gateway);

        let report = ops
            .burn(&context(), asset(), Amount::new(dec!(1)).unwrap(), None)
            .await
            .unwrap();

        assert_eq!(report.status, OperationStatus::Failed);
        assert!(report.error.as_deref().unwrap().contains("unreachable"));

        let entry = store
            .audit()
            .find_by_operation(report.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.status, OperationStatus::Failed);
    }

    #[tokio::test]
    async fn test_buyback_insufficient_funds_is_recorded() {
        let gateway = Arc::new(StubGateway::new());
        gateway.set_native_balance(dec!(0.5));
        let (ops, _store) = ops_with(gateway);

        let report = ops
            .buyback(&context(), asset(), Amount::new(dec!(2)).unwrap(), None)
            .await
            .unwrap();

        assert_eq!(report.status, OperationStatus::Failed);
        assert!(report.error.as_deref().unwrap().contains("insufficient"));
    }

    #[tokio::test]
    async fn test_claim_success() {
        let gateway = Arc::new(StubGateway::new());
        let (ops, store) = ops_with(gateway);

        let report = ops.claim(&context(), asset(), None).await.unwrap();

        assert!(report.is_success());
        let record = store
            .operations()
            .find_by_id(report.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.kind, OperationKind::RewardClaim);
        assert_eq!(record.quantity, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_deploy_reports_created_asset() {
        let gateway = Arc::new(StubGateway::new());
        let (ops, _store) = ops_with(gateway);

        let profile = AssetProfile {
            name: "Test Coin".to_string(),
            symbol: "TEST".to_string(),
            metadata_uri: None,
            initial_buy: Some(Amount::new(dec!(0.5)).unwrap()),
        };
        let report = ops.deploy(&context(), profile, None).await.unwrap();

        assert!(report.is_success());
        assert!(report
            .asset_id
            .as_ref()
            .unwrap()
            .as_str()
            .starts_with("STUBMINT"));
    }

    #[tokio::test]
    async fn test_refresh_balances_updates_cache() {
        let gateway = Arc::new(StubGateway::new());
        gateway.set_native_balance(dec!(12.5));
        gateway.set_asset_balance(&asset(), dec!(1000000));
        let (ops, store) = ops_with(gateway);

        let ctx = context().with_asset(asset());
        let balances = ops.refresh_balances(&ctx).await.unwrap();

        assert_eq!(balances.native, dec!(12.5));
        assert_eq!(balances.asset, dec!(1000000));

        let cached = store.balances().get().await.unwrap().unwrap();
        assert_eq!(cached.native, dec!(12.5));
    }

    #[tokio::test]
    async fn test_refresh_balances_outage_leaves_cache_untouched() {
        let gateway = Arc::new(StubGateway::new());
        let (ops, store) = ops_with(gateway.clone());

        gateway.set_native_balance(dec!(1));
        let ctx = context();
        ops.refresh_balances(&ctx).await.unwrap();

        gateway.set_fail_next(true);
        let result = ops.refresh_balances(&ctx).await;
        assert!(matches!(result, Err(ExecError::UpstreamUnavailable(_))));

        // Stale cache survives the failed refresh.
        assert!(store.balances().get().await.unwrap().is_some());
    }
}
