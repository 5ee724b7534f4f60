//! Automated advisory cycle.
//!
//! Each tick consumes one recommendation from the advisory service and
//! dispatches it through the treasury manager. A `Hold` becomes pure audit
//! commentary; every other action runs the corresponding operation with
//! the advisor's rationale recorded as the reason.

use tracing::info;

use bursar_exec::{Advisor, HolderDirectory, LedgerGateway};
use bursar_store::Store;

use crate::error::{DaemonError, DaemonResult};
use crate::treasury::TreasuryManager;

/// Run one advisory cycle tick.
pub async fn run_once<G, D, S>(
    manager: &TreasuryManager<G, D, S>,
    advisor: &dyn Advisor,
) -> DaemonResult<()>
where
    G: LedgerGateway,
    D: HolderDirectory,
    S: Store,
{
    let recommendation = advisor
        .recommend(manager.context().managed_asset())
        .await
        .map_err(|e| DaemonError::Advisory(e.to_string()))?;

    info!(
        action = ?recommendation.action,
        rationale = %recommendation.rationale,
        "Advisory recommendation received"
    );

    manager.apply_recommendation(recommendation).await
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use bursar_domain::{Address, Amount, AssetId, TreasuryContext, WalletKey};
    use bursar_exec::{
        AdvisedAction, NoPacing, Recommendation, StubAdvisor, StubGateway, StubHolderDirectory,
    };
    use bursar_store::MemoryStore;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::time::Duration;

    fn manager_with_store() -> (
        TreasuryManager<StubGateway, StubHolderDirectory, MemoryStore>,
        Arc<MemoryStore>,
    ) {
        let store = Arc::new(MemoryStore::new());
        let context = TreasuryContext::new(
            WalletKey::new("test-wallet-key").unwrap(),
            Address::new("TREASURY1").unwrap(),
        )
        .with_asset(AssetId::new("MINT1").unwrap());

        let manager = TreasuryManager::new(
            context,
            Arc::new(StubGateway::new()),
            Arc::new(StubHolderDirectory::new()),
            store.clone(),
            Arc::new(NoPacing),
            Duration::from_secs(5),
            9,
        );
        (manager, store)
    }

    #[tokio::test]
    async fn test_hold_recommendation_records_commentary_only() {
        let (manager, store) = manager_with_store();
        let advisor = StubAdvisor::new();

        run_once(&manager, &advisor).await.unwrap();

        assert_eq!(store.audit_count(), 1);
        assert_eq!(store.operation_count(), 0);
    }

    #[tokio::test]
    async fn test_buyback_recommendation_runs_operation() {
        let (manager, store) = manager_with_store();
        let advisor = StubAdvisor::new();
        advisor.set_recommendation(Recommendation {
            action: AdvisedAction::Buyback,
            amount: Some(Amount::new(dec!(0.5)).unwrap()),
            rationale: "dip detected".to_string(),
        });

        run_once(&manager, &advisor).await.unwrap();

        assert_eq!(store.operation_count(), 1);
        // Operation record plus its paired audit entry.
        assert_eq!(store.audit_count(), 1);
    }

    #[tokio::test]
    async fn test_advisor_outage_surfaces_advisory_error() {
        let (manager, _store) = manager_with_store();
        let advisor = StubAdvisor::new();
        advisor.set_fail_next(true);

        let result = run_once(&manager, &advisor).await;
        assert!(matches!(result, Err(DaemonError::Advisory(_))));
    }
}
