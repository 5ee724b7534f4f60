//! Repository trait definitions (Ports)
//!
//! These traits define the storage interface for the treasury records.
//! Implementations can be in-memory (tests, single node) or a database.
//!
//! Concurrency contract: multiple readers, single writer per record. The
//! operation ledger is the only mutator of operation records and audit
//! entries; reads (`find_*`, `list`) never mutate stored state.

use crate::error::StoreError;
use async_trait::async_trait;
use bursar_domain::{
    AssetId, AuditEntry, AuditId, HolderSnapshot, OperationId, OperationKind, OperationRecord,
    SnapshotId, TreasuryBalances,
};

/// Filter for operation listing (kind and/or asset id).
#[derive(Debug, Clone, Default)]
pub struct OperationFilter {
    /// Match only this operation kind
    pub kind: Option<OperationKind>,
    /// Match only operations concerning this asset
    pub asset_id: Option<AssetId>,
}

impl OperationFilter {
    /// Whether a record passes the filter.
    pub fn matches(&self, record: &OperationRecord) -> bool {
        if let Some(kind) = self.kind {
            if record.kind != kind {
                return false;
            }
        }
        if let Some(asset_id) = &self.asset_id {
            if record.asset_id.as_ref() != Some(asset_id) {
                return false;
            }
        }
        true
    }
}

/// Repository for OperationRecord entities
#[async_trait]
pub trait OperationRepository: Send + Sync {
    /// Insert a new record; fails with `Duplicate` on id collision
    async fn insert(&self, record: &OperationRecord) -> Result<(), StoreError>;

    /// Update an existing record by id; fails with `NotFound` if missing
    async fn update(&self, record: &OperationRecord) -> Result<(), StoreError>;

    /// Find a record by ID
    async fn find_by_id(&self, id: OperationId) -> Result<Option<OperationRecord>, StoreError>;

    /// List records newest-first, filtered, with offset/limit paging
    async fn list(
        &self,
        filter: &OperationFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<OperationRecord>, StoreError>;

    /// Count records matching the filter
    async fn count(&self, filter: &OperationFilter) -> Result<usize, StoreError>;
}

/// Repository for AuditEntry entities
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Insert a new entry; fails with `Duplicate` on id collision
    async fn insert(&self, entry: &AuditEntry) -> Result<(), StoreError>;

    /// Update an existing entry by id; fails with `NotFound` if missing
    async fn update(&self, entry: &AuditEntry) -> Result<(), StoreError>;

    /// Find an entry by ID
    async fn find_by_id(&self, id: AuditId) -> Result<Option<AuditEntry>, StoreError>;

    /// Find the entry paired with an operation via the `operation_id`
    /// metadata key (shared metadata, not a foreign key)
    async fn find_by_operation(
        &self,
        operation_id: OperationId,
    ) -> Result<Option<AuditEntry>, StoreError>;

    /// List the most recent entries, newest-first
    async fn list_recent(&self, limit: usize) -> Result<Vec<AuditEntry>, StoreError>;
}

/// Repository for HolderSnapshot entities (insert-only; snapshots are
/// immutable once created)
#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// Insert a new snapshot; fails with `Duplicate` on id collision
    async fn insert(&self, snapshot: &HolderSnapshot) -> Result<(), StoreError>;

    /// Find a snapshot by ID
    async fn find_by_id(&self, id: SnapshotId) -> Result<Option<HolderSnapshot>, StoreError>;

    /// Find the most recently captured snapshot for an asset
    async fn find_latest(&self, asset_id: &AssetId) -> Result<Option<HolderSnapshot>, StoreError>;
}

/// Repository for the singleton treasury balance cache
#[async_trait]
pub trait BalanceRepository: Send + Sync {
    /// Read the cached balances, if any refresh has happened yet
    async fn get(&self) -> Result<Option<TreasuryBalances>, StoreError>;

    /// Replace the cached balances
    async fn put(&self, balances: TreasuryBalances) -> Result<(), StoreError>;
}

/// Combined store interface
pub trait Store: Send + Sync {
    /// Get operation repository
    fn operations(&self) -> &dyn OperationRepository;

    /// Get audit repository
    fn audit(&self) -> &dyn AuditRepository;

    /// Get snapshot repository
    fn snapshots(&self) -> &dyn SnapshotRepository;

    /// Get balance cache repository
    fn balances(&self) -> &dyn BalanceRepository;
}
