//! Operation Ledger: opens, tracks, and closes operation records.
//!
//! The ledger is the single writer of operation records and their paired
//! audit entries. Every operation opens in its initial non-terminal status
//! together with an audit entry carrying the caller's rationale, and closes
//! exactly once to a terminal status. A second close of the same record is
//! an internal-consistency fault and is surfaced loudly, never swallowed.
//!
//! # Flow
//!
//! ```text
//! open -> record (pending/processing) + audit entry
//! ...execution elsewhere...
//! close -> terminal status + completion time, audit entry closed alike
//! ```

use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::json;
use tracing::{error, info};

use bursar_domain::{
    AssetId, AuditEntry, AuditId, OperationId, OperationKind, OperationRecord, OperationStatus,
    RecipientOutcome,
};
use bursar_store::{OperationFilter, Store};

use crate::error::{ExecError, ExecResult};

// =============================================================================
// Operation Outcome
// =============================================================================

/// Terminal outcome used to close an operation record.
#[derive(Debug)]
pub enum OperationOutcome {
    /// Single-call operation settled; carries the settlement signature
    Success {
        /// Settlement signature returned by the gateway
        signature: String,
    },
    /// Deployment settled; carries the created asset and its signature
    Deployed {
        /// The newly created asset
        asset: AssetId,
        /// Settlement signature returned by the gateway
        signature: String,
    },
    /// Single-call operation failed; carries the gateway's error string
    Failure {
        /// Error string recorded on the record
        error: String,
    },
    /// Distribution finished; the full outcome sequence in request order
    Distribution {
        /// Per-recipient outcomes
        outcomes: Vec<RecipientOutcome>,
    },
}

// =============================================================================
// Operation Ledger
// =============================================================================

/// Manages the pending -> terminal lifecycle for every operation type.
pub struct OperationLedger<S: Store> {
    store: Arc<S>,
}

impl<S: Store> Clone for OperationLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: Store> OperationLedger<S> {
    /// Create a ledger over a store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Open a single-call operation record plus its paired audit entry.
    ///
    /// No side effects beyond storage. A storage fault is fatal for the
    /// caller: no operation may proceed without an audit trail.
    pub async fn open(
        &self,
        kind: OperationKind,
        asset_id: Option<AssetId>,
        quantity: Decimal,
        reason: Option<String>,
    ) -> ExecResult<OperationId> {
        let record = OperationRecord::open(kind, asset_id, quantity, reason.clone());
        self.store.operations().insert(&record).await?;

        let entry = AuditEntry::open(
            kind.action_name(),
            reason,
            pairing_metadata(&record),
            OperationStatus::Pending,
        );
        self.store.audit().insert(&entry).await?;

        info!(operation_id = %record.id, kind = %kind, quantity = %quantity, "Operation opened");
        Ok(record.id)
    }

    /// Open a distribution record in `processing` status with an empty
    /// outcome sequence, plus its paired audit entry.
    pub async fn open_distribution(
        &self,
        asset_id: Option<AssetId>,
        recipient_count: usize,
        total_requested: Decimal,
        reason: Option<String>,
    ) -> ExecResult<OperationId> {
        let record =
            OperationRecord::open_distribution(asset_id, recipient_count, total_requested, reason.clone());
        self.store.operations().insert(&record).await?;

        let entry = AuditEntry::open(
            OperationKind::Distribution.action_name(),
            reason,
            pairing_metadata(&record),
            OperationStatus::Processing,
        );
        self.store.audit().insert(&entry).await?;

        info!(
            operation_id = %record.id,
            recipients = recipient_count,
            total = %total_requested,
            "Distribution opened"
        );
        Ok(record.id)
    }

    /// Close an operation to a terminal status and stamp the completion
    /// time, then close the paired audit entry with the same status.
    ///
    /// # Errors
    /// Returns `ExecError::InternalConsistency` if the record does not
    /// exist or is already terminal. The engine guarantees single-writer
    /// semantics per record, so either case is a caller bug.
    pub async fn close(
        &self,
        id: OperationId,
        outcome: OperationOutcome,
    ) -> ExecResult<OperationRecord> {
        let mut record = self
            .store
            .operations()
            .find_by_id(id)
            .await?
            .ok_or_else(|| {
                error!(operation_id = %id, "Close attempted on unknown operation");
                ExecError::InternalConsistency(format!("close of unknown operation {}", id))
            })?;

        if record.is_terminal() {
            error!(
                operation_id = %id,
                status = %record.status,
                "Close attempted on already-terminal operation"
            );
            return Err(ExecError::InternalConsistency(format!(
                "operation {} is already terminal ({})",
                id, record.status
            )));
        }

        match outcome {
            OperationOutcome::Success { signature } => {
                record.complete_success(signature)?;
            }
            OperationOutcome::Deployed { asset, signature } => {
                record.asset_id = Some(asset);
                record.complete_success(signature)?;
            }
            OperationOutcome::Failure { error } => {
                record.complete_failed(error)?;
            }
            OperationOutcome::Distribution { outcomes } => {
                record.complete_distribution(outcomes)?;
            }
        }

        self.store.operations().update(&record).await?;

        if let Some(mut entry) = self.store.audit().find_by_operation(id).await? {
            entry.complete(record.status)?;
            self.store.audit().update(&entry).await?;
        }

        info!(operation_id = %id, status = %record.status, "Operation closed");
        Ok(record)
    }

    /// Record standalone audit commentary with no financial operation
    /// attached (e.g. an advisory "hold" decision).
    pub async fn note(
        &self,
        action: impl Into<String>,
        rationale: Option<String>,
        metadata: serde_json::Value,
    ) -> ExecResult<AuditId> {
        let entry = AuditEntry::note(action, rationale, metadata);
        self.store.audit().insert(&entry).await?;
        Ok(entry.id)
    }

    /// Read a single operation record.
    pub async fn get(&self, id: OperationId) -> ExecResult<Option<OperationRecord>> {
        Ok(self.store.operations().find_by_id(id).await?)
    }

    /// List operation records newest-first.
    pub async fn list(
        &self,
        filter: &OperationFilter,
        limit: usize,
        offset: usize,
    ) -> ExecResult<Vec<OperationRecord>> {
        Ok(self.store.operations().list(filter, limit, offset).await?)
    }
}

/// Shared metadata that pairs an audit entry with its operation record.
fn pairing_metadata(record: &OperationRecord) -> serde_json::Value {
    json!({
        "operation_id": record.id.to_string(),
        "kind": record.kind,
        "asset": record.asset_id.as_ref().map(|a| a.to_string()),
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use bursar_domain::Address;
    use bursar_store::MemoryStore;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn asset() -> AssetId {
        AssetId::new("MINT1").unwrap()
    }

    fn ledger() -> (OperationLedger<MemoryStore>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (OperationLedger::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_open_creates_record_and_audit_entry() {
        let (ledger, store) = ledger();

        let id = ledger
            .open(
                OperationKind::Burn,
                Some(asset()),
                dec!(1000),
                Some("weekly burn".to_string()),
            )
            .await
            .unwrap();

        let record = store.operations().find_by_id(id).await.unwrap().unwrap();
        assert_eq!(record.status, OperationStatus::Pending);
        assert_eq!(record.kind, OperationKind::Burn);

        let entry = store.audit().find_by_operation(id).await.unwrap().unwrap();
        assert_eq!(entry.status, OperationStatus::Pending);
        assert_eq!(entry.action, "burn supply");
        assert_eq!(entry.rationale.as_deref(), Some("weekly burn"));
    }

    #[tokio::test]
    async fn test_close_success_closes_audit_entry_alike() {
        let (ledger, store) = ledger();

        let id = ledger
            .open(OperationKind::Burn, Some(asset()), dec!(1000), None)
            .await
            .unwrap();
        let record = ledger
            .close(
                id,
                OperationOutcome::Success {
                    signature: "SIG1".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(record.status, OperationStatus::Success);
        assert_eq!(record.signature.as_deref(), Some("SIG1"));
        assert!(record.completed_at.is_some());

        let entry = store.audit().find_by_operation(id).await.unwrap().unwrap();
        assert_eq!(entry.status, OperationStatus::Success);
        assert!(entry.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_close_failure_records_error() {
        let (ledger, _store) = ledger();

        let id = ledger
            .open(OperationKind::Buyback, Some(asset()), dec!(2), None)
            .await
            .unwrap();
        let record = ledger
            .close(
                id,
                OperationOutcome::Failure {
                    error: "insufficient treasury funds".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(record.status, OperationStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("insufficient treasury funds"));
    }

    #[tokio::test]
    async fn test_double_close_is_internal_consistency_fault() {
        let (ledger, _store) = ledger();

        let id = ledger
            .open(OperationKind::Burn, Some(asset()), dec!(1), None)
            .await
            .unwrap();
        ledger
            .close(
                id,
                OperationOutcome::Success {
                    signature: "SIG1".to_string(),
                },
            )
            .await
            .unwrap();

        let result = ledger
            .close(
                id,
                OperationOutcome::Failure {
                    error: "late".to_string(),
                },
            )
            .await;
        assert!(matches!(result, Err(ExecError::InternalConsistency(_))));
    }

    #[tokio::test]
    async fn test_close_unknown_operation_is_internal_consistency_fault() {
        let (ledger, _store) = ledger();

        let result = ledger
            .close(
                Uuid::now_v7(),
                OperationOutcome::Success {
                    signature: "SIG1".to_string(),
                },
            )
            .await;
        assert!(matches!(result, Err(ExecError::InternalConsistency(_))));
    }

    #[tokio::test]
    async fn test_distribution_lifecycle() {
        let (ledger, store) = ledger();

        let id = ledger
            .open_distribution(Some(asset()), 2, dec!(300), None)
            .await
            .unwrap();
        let record = store.operations().find_by_id(id).await.unwrap().unwrap();
        assert_eq!(record.status, OperationStatus::Processing);

        let outcomes = vec![
            RecipientOutcome::succeeded(Address::new("A1").unwrap(), dec!(100), "SIG1"),
            RecipientOutcome::failed(Address::new("B2").unwrap(), dec!(200), "rejected"),
        ];
        let record = ledger
            .close(id, OperationOutcome::Distribution { outcomes })
            .await
            .unwrap();

        assert_eq!(record.status, OperationStatus::Partial);

        let entry = store.audit().find_by_operation(id).await.unwrap().unwrap();
        assert_eq!(entry.status, OperationStatus::Partial);
    }

    #[tokio::test]
    async fn test_deployed_outcome_attaches_asset() {
        let (ledger, _store) = ledger();

        let id = ledger
            .open(OperationKind::Deployment, None, dec!(0), None)
            .await
            .unwrap();
        let record = ledger
            .close(
                id,
                OperationOutcome::Deployed {
                    asset: AssetId::new("NEWMINT").unwrap(),
                    signature: "SIG1".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(record.asset_id.unwrap().as_str(), "NEWMINT");
        assert_eq!(record.status, OperationStatus::Success);
    }

    #[tokio::test]
    async fn test_note_records_terminal_commentary() {
        let (ledger, store) = ledger();

        let id = ledger
            .note(
                "hold",
                Some("sentiment neutral".to_string()),
                serde_json::Value::Null,
            )
            .await
            .unwrap();

        let entry = store.audit().find_by_id(id).await.unwrap().unwrap();
        assert!(entry.status.is_terminal());
        assert_eq!(entry.action, "hold");
    }

    #[tokio::test]
    async fn test_list_newest_first_with_filter() {
        let (ledger, _store) = ledger();

        ledger
            .open(OperationKind::Burn, Some(asset()), dec!(1), None)
            .await
            .unwrap();
        let claim_id = ledger
            .open(OperationKind::RewardClaim, Some(asset()), dec!(0), None)
            .await
            .unwrap();

        let filter = OperationFilter {
            kind: Some(OperationKind::RewardClaim),
            asset_id: None,
        };
        let listed = ledger.list(&filter, 10, 0).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, claim_id);
    }
}
