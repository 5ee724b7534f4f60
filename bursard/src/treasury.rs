//! Treasury Manager: orchestrates treasury operations.
//!
//! Wires the operation ledger, single-call executor, distribution engine,
//! and snapshot service over one store, resolves recipient lists (explicit
//! or planned from a snapshot), and refreshes the balance cache after an
//! operation moves funds. The engine itself never refreshes balances; a
//! failed refresh here is logged and swallowed so it cannot contaminate
//! the operation's own result.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::warn;

use bursar_domain::{
    Amount, AssetId, HolderSnapshot, OperationId, OperationRecord, SnapshotId, TreasuryBalances,
    TreasuryContext,
};
use bursar_exec::{
    plan_proportional, AdvisedAction, AssetProfile, DistributionEngine, DistributionKind,
    DistributionResult, HolderDirectory, LedgerGateway, OperationLedger, OperationReport, Pacer,
    Recipient, Recommendation, SnapshotService, TreasuryOps,
};
use bursar_store::{OperationFilter, Store};

use crate::error::{DaemonError, DaemonResult};

/// Orchestrates the treasury's components for API handlers and the
/// advisory cycle.
pub struct TreasuryManager<G: LedgerGateway, D: HolderDirectory, S: Store> {
    context: TreasuryContext,
    ledger: OperationLedger<S>,
    ops: TreasuryOps<G, S>,
    engine: DistributionEngine<G, S>,
    snapshots: SnapshotService<D, S>,
    store: Arc<S>,
    plan_scale: u32,
}

impl<G: LedgerGateway, D: HolderDirectory, S: Store> TreasuryManager<G, D, S> {
    /// Wire a manager over shared gateway, directory, and store.
    pub fn new(
        context: TreasuryContext,
        gateway: Arc<G>,
        directory: Arc<D>,
        store: Arc<S>,
        pacer: Arc<dyn Pacer>,
        call_timeout: Duration,
        plan_scale: u32,
    ) -> Self {
        let ledger = OperationLedger::new(store.clone());
        let ops = TreasuryOps::new(
            gateway.clone(),
            ledger.clone(),
            store.clone(),
            call_timeout,
        );
        let engine = DistributionEngine::new(gateway, ledger.clone(), pacer, call_timeout);
        let snapshots = SnapshotService::new(directory, store.clone(), call_timeout);

        Self {
            context,
            ledger,
            ops,
            engine,
            snapshots,
            store,
            plan_scale,
        }
    }

    /// The context this manager operates under.
    pub fn context(&self) -> &TreasuryContext {
        &self.context
    }

    // =========================================================================
    // Single-call operations
    // =========================================================================

    /// Deploy the managed asset.
    pub async fn deploy(
        &self,
        profile: AssetProfile,
        reason: Option<String>,
    ) -> DaemonResult<OperationReport> {
        let report = self.ops.deploy(&self.context, profile, reason).await?;
        if report.is_success() {
            self.refresh_after().await;
        }
        Ok(report)
    }

    /// Burn managed asset supply.
    pub async fn burn(
        &self,
        asset: AssetId,
        amount: Amount,
        reason: Option<String>,
    ) -> DaemonResult<OperationReport> {
        let report = self.ops.burn(&self.context, asset, amount, reason).await?;
        if report.is_success() {
            self.refresh_after().await;
        }
        Ok(report)
    }

    /// Buy back managed asset supply with the native asset.
    pub async fn buyback(
        &self,
        asset: AssetId,
        native_amount: Amount,
        reason: Option<String>,
    ) -> DaemonResult<OperationReport> {
        let report = self
            .ops
            .buyback(&self.context, asset, native_amount, reason)
            .await?;
        if report.is_success() {
            self.refresh_after().await;
        }
        Ok(report)
    }

    /// Claim accrued issuer rewards.
    pub async fn claim(
        &self,
        asset: AssetId,
        reason: Option<String>,
    ) -> DaemonResult<OperationReport> {
        let report = self.ops.claim(&self.context, asset, reason).await?;
        if report.is_success() {
            self.refresh_after().await;
        }
        Ok(report)
    }

    // =========================================================================
    // Distributions
    // =========================================================================

    /// Distribute to an explicit recipient list.
    pub async fn distribute(
        &self,
        kind: DistributionKind,
        asset_id: Option<AssetId>,
        recipients: Vec<Recipient>,
        reason: Option<String>,
    ) -> DaemonResult<DistributionResult> {
        let result = self
            .engine
            .distribute(&self.context, kind, asset_id, recipients, reason)
            .await?;
        if result.success_count > 0 {
            self.refresh_after().await;
        }
        Ok(result)
    }

    /// Distribute proportionally to snapshot holders: the managed asset
    /// itself, or the native asset as a revenue share.
    ///
    /// With a snapshot id, plans from that stored snapshot (and its asset);
    /// without one, captures a fresh snapshot of the configured asset first.
    pub async fn distribute_from_snapshot(
        &self,
        kind: DistributionKind,
        snapshot_id: Option<SnapshotId>,
        total: Amount,
        reason: Option<String>,
    ) -> DaemonResult<DistributionResult> {
        let snapshot = match snapshot_id {
            Some(id) => self
                .snapshots
                .get(id)
                .await?
                .ok_or(DaemonError::SnapshotNotFound(id))?,
            None => {
                let asset = self.configured_asset()?;
                self.snapshots.capture(&asset).await?
            }
        };

        let asset = match kind {
            DistributionKind::Asset => Some(snapshot.asset_id.clone()),
            DistributionKind::Native => None,
        };

        let recipients = plan_proportional(&snapshot, total, self.plan_scale)?;
        self.distribute(kind, asset, recipients, reason).await
    }

    // =========================================================================
    // Snapshots, balances, reads
    // =========================================================================

    /// Capture a holder snapshot of `asset` (or of the configured asset).
    pub async fn capture_snapshot(
        &self,
        asset: Option<AssetId>,
    ) -> DaemonResult<HolderSnapshot> {
        let asset = match asset {
            Some(asset) => asset,
            None => self.configured_asset()?,
        };
        Ok(self.snapshots.capture(&asset).await?)
    }

    /// Read a snapshot by id.
    pub async fn get_snapshot(&self, id: SnapshotId) -> DaemonResult<HolderSnapshot> {
        self.snapshots
            .get(id)
            .await?
            .ok_or(DaemonError::SnapshotNotFound(id))
    }

    /// Read the cached balances, refreshing from the gateway when asked or
    /// when no refresh has happened yet.
    pub async fn balances(&self, refresh: bool) -> DaemonResult<TreasuryBalances> {
        if !refresh {
            if let Some(cached) = self.store.balances().get().await? {
                return Ok(cached);
            }
        }
        Ok(self.ops.refresh_balances(&self.context).await?)
    }

    /// Read a single operation record.
    pub async fn get_operation(&self, id: OperationId) -> DaemonResult<OperationRecord> {
        self.ledger
            .get(id)
            .await?
            .ok_or(DaemonError::OperationNotFound(id))
    }

    /// List operation records newest-first.
    pub async fn list_operations(
        &self,
        filter: &OperationFilter,
        limit: usize,
        offset: usize,
    ) -> DaemonResult<Vec<OperationRecord>> {
        Ok(self.ledger.list(filter, limit, offset).await?)
    }

    /// Total number of records matching a filter (for list paging).
    pub async fn count_operations(&self, filter: &OperationFilter) -> DaemonResult<usize> {
        Ok(self.store.operations().count(filter).await?)
    }

    // =========================================================================
    // Advisory
    // =========================================================================

    /// Apply an advisory recommendation: `Hold` becomes audit commentary,
    /// every other action dispatches the corresponding operation with the
    /// advisor's rationale as the reason.
    pub async fn apply_recommendation(&self, recommendation: Recommendation) -> DaemonResult<()> {
        let Recommendation {
            action,
            amount,
            rationale,
        } = recommendation;

        match action {
            AdvisedAction::Hold => {
                let asset = self.context.managed_asset().map(|a| a.to_string());
                self.ledger
                    .note("hold", Some(rationale), json!({ "asset": asset }))
                    .await?;
            }
            AdvisedAction::Burn => {
                let asset = self.configured_asset()?;
                let amount = Self::advised_amount(amount, "burn")?;
                self.burn(asset, amount, Some(rationale)).await?;
            }
            AdvisedAction::Buyback => {
                let asset = self.configured_asset()?;
                let amount = Self::advised_amount(amount, "buyback")?;
                self.buyback(asset, amount, Some(rationale)).await?;
            }
            AdvisedAction::ClaimRewards => {
                let asset = self.configured_asset()?;
                self.claim(asset, Some(rationale)).await?;
            }
            AdvisedAction::Distribute => {
                let amount = Self::advised_amount(amount, "distribute")?;
                self.distribute_from_snapshot(
                    DistributionKind::Asset,
                    None,
                    amount,
                    Some(rationale),
                )
                .await?;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn configured_asset(&self) -> DaemonResult<AssetId> {
        self.context
            .managed_asset()
            .cloned()
            .ok_or_else(|| DaemonError::Config("no managed asset configured".to_string()))
    }

    fn advised_amount(amount: Option<Amount>, action: &str) -> DaemonResult<Amount> {
        amount.ok_or_else(|| {
            DaemonError::Advisory(format!("{} recommendation carried no amount", action))
        })
    }

    /// Refresh the balance cache after an operation moved funds. A refresh
    /// failure is logged and swallowed; the cache is best-effort.
    async fn refresh_after(&self) {
        if let Err(e) = self.ops.refresh_balances(&self.context).await {
            warn!(error = %e, "Balance refresh after operation failed");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use bursar_domain::{Address, OperationStatus, WalletKey};
    use bursar_exec::{NoPacing, StubGateway, StubHolderDirectory};
    use bursar_store::MemoryStore;
    use rust_decimal_macros::dec;

    struct Fixture {
        manager: TreasuryManager<StubGateway, StubHolderDirectory, MemoryStore>,
        gateway: Arc<StubGateway>,
        directory: Arc<StubHolderDirectory>,
        store: Arc<MemoryStore>,
    }

    fn asset() -> AssetId {
        AssetId::new("MINT1").unwrap()
    }

    fn fixture() -> Fixture {
        let gateway = Arc::new(StubGateway::new());
        let directory = Arc::new(StubHolderDirectory::new());
        let store = Arc::new(MemoryStore::new());
        let context = TreasuryContext::new(
            WalletKey::new("test-wallet-key").unwrap(),
            Address::new("TREASURY1").unwrap(),
        )
        .with_asset(asset());

        let manager = TreasuryManager::new(
            context,
            gateway.clone(),
            directory.clone(),
            store.clone(),
            Arc::new(NoPacing),
            Duration::from_secs(5),
            9,
        );
        Fixture {
            manager,
            gateway,
            directory,
            store,
        }
    }

    #[tokio::test]
    async fn test_burn_refreshes_balance_cache() {
        let f = fixture();
        f.gateway.set_asset_balance(&asset(), dec!(5000));

        let report = f
            .manager
            .burn(asset(), Amount::new(dec!(1000)).unwrap(), None)
            .await
            .unwrap();
        assert!(report.is_success());

        // Balance cache was refreshed after the completed operation.
        let cached = f.store.balances().get().await.unwrap().unwrap();
        assert_eq!(cached.asset, dec!(4000));
    }

    #[tokio::test]
    async fn test_distribute_from_fresh_snapshot_is_proportional() {
        let f = fixture();
        f.directory.set_holders(
            &asset(),
            vec![
                (Address::new("A1").unwrap(), dec!(70)),
                (Address::new("B2").unwrap(), dec!(20)),
                (Address::new("C3").unwrap(), dec!(10)),
            ],
        );

        let result = f
            .manager
            .distribute_from_snapshot(
                DistributionKind::Asset,
                None,
                Amount::new(dec!(100)).unwrap(),
                None,
            )
            .await
            .unwrap();

        assert_eq!(result.status, OperationStatus::Completed);
        assert_eq!(result.outcomes.len(), 3);
        assert_eq!(result.outcomes[0].requested_amount, dec!(70));
        assert_eq!(result.outcomes[2].requested_amount, dec!(10));
        assert_eq!(result.total_requested, dec!(100));

        // The snapshot used for planning was persisted.
        assert_eq!(f.store.snapshot_count(), 1);
    }

    #[tokio::test]
    async fn test_distribute_from_stored_snapshot() {
        let f = fixture();
        f.directory
            .set_holders(&asset(), vec![(Address::new("A1").unwrap(), dec!(1))]);
        let snapshot = f.manager.capture_snapshot(None).await.unwrap();

        let result = f
            .manager
            .distribute_from_snapshot(
                DistributionKind::Asset,
                Some(snapshot.id),
                Amount::new(dec!(50)).unwrap(),
                None,
            )
            .await
            .unwrap();

        assert_eq!(result.outcomes.len(), 1);
        assert_eq!(result.outcomes[0].requested_amount, dec!(50));
        // No second capture happened.
        assert_eq!(f.store.snapshot_count(), 1);
    }

    #[tokio::test]
    async fn test_distribute_from_missing_snapshot() {
        let f = fixture();
        let result = f
            .manager
            .distribute_from_snapshot(
                DistributionKind::Asset,
                Some(uuid::Uuid::now_v7()),
                Amount::new(dec!(1)).unwrap(),
                None,
            )
            .await;
        assert!(matches!(result, Err(DaemonError::SnapshotNotFound(_))));
    }

    #[tokio::test]
    async fn test_empty_snapshot_never_reaches_engine() {
        let f = fixture();
        // Directory returns no holders for the asset.
        let result = f
            .manager
            .distribute_from_snapshot(
                DistributionKind::Asset,
                None,
                Amount::new(dec!(100)).unwrap(),
                None,
            )
            .await;

        assert!(matches!(
            result,
            Err(DaemonError::Exec(bursar_exec::ExecError::EmptySnapshot(_)))
        ));
        // The snapshot capture persisted, but no distribution record exists.
        assert_eq!(f.store.operation_count(), 0);
    }

    #[tokio::test]
    async fn test_apply_hold_recommendation_records_note() {
        let f = fixture();
        f.manager
            .apply_recommendation(Recommendation {
                action: AdvisedAction::Hold,
                amount: None,
                rationale: "sentiment neutral".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(f.store.audit_count(), 1);
        assert_eq!(f.store.operation_count(), 0);
    }

    #[tokio::test]
    async fn test_apply_burn_recommendation_executes_operation() {
        let f = fixture();
        f.manager
            .apply_recommendation(Recommendation {
                action: AdvisedAction::Burn,
                amount: Some(Amount::new(dec!(1000)).unwrap()),
                rationale: "supply overhang".to_string(),
            })
            .await
            .unwrap();

        let listed = f
            .manager
            .list_operations(&OperationFilter::default(), 10, 0)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].reason.as_deref(), Some("supply overhang"));
        assert_eq!(listed[0].status, OperationStatus::Success);
    }

    #[tokio::test]
    async fn test_apply_recommendation_without_amount_is_advisory_error() {
        let f = fixture();
        let result = f
            .manager
            .apply_recommendation(Recommendation {
                action: AdvisedAction::Burn,
                amount: None,
                rationale: "?".to_string(),
            })
            .await;
        assert!(matches!(result, Err(DaemonError::Advisory(_))));
    }

    #[tokio::test]
    async fn test_balances_uses_cache_unless_refresh_requested() {
        let f = fixture();
        f.gateway.set_native_balance(dec!(10));

        let first = f.manager.balances(false).await.unwrap();
        assert_eq!(first.native, dec!(10));

        // Gateway balance changes; cached value is served until refresh.
        f.gateway.set_native_balance(dec!(7));
        let cached = f.manager.balances(false).await.unwrap();
        assert_eq!(cached.native, dec!(10));

        let refreshed = f.manager.balances(true).await.unwrap();
        assert_eq!(refreshed.native, dec!(7));
    }

    #[tokio::test]
    async fn test_get_operation_not_found() {
        let f = fixture();
        let result = f.manager.get_operation(uuid::Uuid::now_v7()).await;
        assert!(matches!(result, Err(DaemonError::OperationNotFound(_))));
    }
}
