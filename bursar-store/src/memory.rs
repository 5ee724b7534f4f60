//! In-memory store implementation
//!
//! Used for testing and single-node deployments without a database.
//! Thread-safe using RwLock for concurrent access.

use crate::error::StoreError;
use crate::repository::{
    AuditRepository, BalanceRepository, OperationFilter, OperationRepository, SnapshotRepository,
    Store,
};
use async_trait::async_trait;
use bursar_domain::{
    AssetId, AuditEntry, AuditId, HolderSnapshot, OperationId, OperationRecord, SnapshotId,
    TreasuryBalances,
};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory store
pub struct MemoryStore {
    operations: RwLock<HashMap<OperationId, OperationRecord>>,
    audit_entries: RwLock<HashMap<AuditId, AuditEntry>>,
    snapshots: RwLock<HashMap<SnapshotId, HolderSnapshot>>,
    balances: RwLock<Option<TreasuryBalances>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self {
            operations: RwLock::new(HashMap::new()),
            audit_entries: RwLock::new(HashMap::new()),
            snapshots: RwLock::new(HashMap::new()),
            balances: RwLock::new(None),
        }
    }

    /// Get the number of operation records
    pub fn operation_count(&self) -> usize {
        self.operations.read().unwrap().len()
    }

    /// Get the number of audit entries
    pub fn audit_count(&self) -> usize {
        self.audit_entries.read().unwrap().len()
    }

    /// Get the number of snapshots
    pub fn snapshot_count(&self) -> usize {
        self.snapshots.read().unwrap().len()
    }

    /// Clear all data (useful for test setup)
    pub fn clear(&self) {
        self.operations.write().unwrap().clear();
        self.audit_entries.write().unwrap().clear();
        self.snapshots.write().unwrap().clear();
        *self.balances.write().unwrap() = None;
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Operation Repository Implementation
// =============================================================================

#[async_trait]
impl OperationRepository for MemoryStore {
    async fn insert(&self, record: &OperationRecord) -> Result<(), StoreError> {
        let mut operations = self.operations.write().unwrap();
        if operations.contains_key(&record.id) {
            return Err(StoreError::duplicate("operation", record.id.to_string()));
        }
        operations.insert(record.id, record.clone());
        Ok(())
    }

    async fn update(&self, record: &OperationRecord) -> Result<(), StoreError> {
        let mut operations = self.operations.write().unwrap();
        if !operations.contains_key(&record.id) {
            return Err(StoreError::not_found("operation", record.id.to_string()));
        }
        operations.insert(record.id, record.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: OperationId) -> Result<Option<OperationRecord>, StoreError> {
        let operations = self.operations.read().unwrap();
        Ok(operations.get(&id).cloned())
    }

    async fn list(
        &self,
        filter: &OperationFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<OperationRecord>, StoreError> {
        let operations = self.operations.read().unwrap();
        let mut matching: Vec<OperationRecord> = operations
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();

        // Newest first; ids are time-ordered (v7) and break created_at ties.
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        Ok(matching.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self, filter: &OperationFilter) -> Result<usize, StoreError> {
        let operations = self.operations.read().unwrap();
        Ok(operations.values().filter(|r| filter.matches(r)).count())
    }
}

// =============================================================================
// Audit Repository Implementation
// =============================================================================

#[async_trait]
impl AuditRepository for MemoryStore {
    async fn insert(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        let mut entries = self.audit_entries.write().unwrap();
        if entries.contains_key(&entry.id) {
            return Err(StoreError::duplicate("audit", entry.id.to_string()));
        }
        entries.insert(entry.id, entry.clone());
        Ok(())
    }

    async fn update(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        let mut entries = self.audit_entries.write().unwrap();
        if !entries.contains_key(&entry.id) {
            return Err(StoreError::not_found("audit", entry.id.to_string()));
        }
        entries.insert(entry.id, entry.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: AuditId) -> Result<Option<AuditEntry>, StoreError> {
        let entries = self.audit_entries.read().unwrap();
        Ok(entries.get(&id).cloned())
    }

    async fn find_by_operation(
        &self,
        operation_id: OperationId,
    ) -> Result<Option<AuditEntry>, StoreError> {
        let entries = self.audit_entries.read().unwrap();
        let operation_id = operation_id.to_string();
        Ok(entries
            .values()
            .find(|e| {
                e.metadata.get("operation_id").and_then(|v| v.as_str())
                    == Some(operation_id.as_str())
            })
            .cloned())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<AuditEntry>, StoreError> {
        let entries = self.audit_entries.read().unwrap();
        let mut all: Vec<AuditEntry> = entries.values().cloned().collect();
        all.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(all.into_iter().take(limit).collect())
    }
}

// =============================================================================
// Snapshot Repository Implementation
// =============================================================================

#[async_trait]
impl SnapshotRepository for MemoryStore {
    async fn insert(&self, snapshot: &HolderSnapshot) -> Result<(), StoreError> {
        let mut snapshots = self.snapshots.write().unwrap();
        if snapshots.contains_key(&snapshot.id) {
            return Err(StoreError::duplicate("snapshot", snapshot.id.to_string()));
        }
        snapshots.insert(snapshot.id, snapshot.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: SnapshotId) -> Result<Option<HolderSnapshot>, StoreError> {
        let snapshots = self.snapshots.read().unwrap();
        Ok(snapshots.get(&id).cloned())
    }

    async fn find_latest(&self, asset_id: &AssetId) -> Result<Option<HolderSnapshot>, StoreError> {
        let snapshots = self.snapshots.read().unwrap();
        Ok(snapshots
            .values()
            .filter(|s| &s.asset_id == asset_id)
            .max_by_key(|s| (s.captured_at, s.id))
            .cloned())
    }
}

// =============================================================================
// Balance Repository Implementation
// =============================================================================

#[async_trait]
impl BalanceRepository for MemoryStore {
    async fn get(&self) -> Result<Option<TreasuryBalances>, StoreError> {
        let balances = self.balances.read().unwrap();
        Ok(*balances)
    }

    async fn put(&self, new_balances: TreasuryBalances) -> Result<(), StoreError> {
        let mut balances = self.balances.write().unwrap();
        *balances = Some(new_balances);
        Ok(())
    }
}

// =============================================================================
// Store Implementation
// =============================================================================

impl Store for MemoryStore {
    fn operations(&self) -> &dyn OperationRepository {
        self
    }

    fn audit(&self) -> &dyn AuditRepository {
        self
    }

    fn snapshots(&self) -> &dyn SnapshotRepository {
        self
    }

    fn balances(&self) -> &dyn BalanceRepository {
        self
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use bursar_domain::{Address, OperationKind, OperationStatus};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn asset(id: &str) -> AssetId {
        AssetId::new(id).unwrap()
    }

    fn burn_record(asset_id: &str) -> OperationRecord {
        OperationRecord::open(
            OperationKind::Burn,
            Some(asset(asset_id)),
            dec!(100),
            None,
        )
    }

    // Operation repository tests
    #[tokio::test]
    async fn test_operation_insert_and_find() {
        let store = MemoryStore::new();
        let record = burn_record("MINT1");
        let id = record.id;

        OperationRepository::insert(&store, &record).await.unwrap();

        let found = OperationRepository::find_by_id(&store, id).await.unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().id, id);
    }

    #[tokio::test]
    async fn test_operation_duplicate_insert_rejected() {
        let store = MemoryStore::new();
        let record = burn_record("MINT1");

        OperationRepository::insert(&store, &record).await.unwrap();
        let result = OperationRepository::insert(&store, &record).await;
        assert!(matches!(result, Err(StoreError::Duplicate { .. })));
    }

    #[tokio::test]
    async fn test_operation_update_missing_rejected() {
        let store = MemoryStore::new();
        let record = burn_record("MINT1");

        let result = OperationRepository::update(&store, &record).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_operation_update_replaces() {
        let store = MemoryStore::new();
        let mut record = burn_record("MINT1");
        OperationRepository::insert(&store, &record).await.unwrap();

        record.complete_success("SIG1").unwrap();
        OperationRepository::update(&store, &record).await.unwrap();

        let found = OperationRepository::find_by_id(&store, record.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.status, OperationStatus::Success);
        assert_eq!(found.signature.as_deref(), Some("SIG1"));
    }

    #[tokio::test]
    async fn test_operation_list_newest_first() {
        let store = MemoryStore::new();
        let first = burn_record("MINT1");
        let second = burn_record("MINT1");
        let third = burn_record("MINT1");

        OperationRepository::insert(&store, &first).await.unwrap();
        OperationRepository::insert(&store, &second).await.unwrap();
        OperationRepository::insert(&store, &third).await.unwrap();

        let listed = OperationRepository::list(&store, &OperationFilter::default(), 10, 0)
            .await
            .unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].id, third.id);
        assert_eq!(listed[2].id, first.id);
    }

    #[tokio::test]
    async fn test_operation_list_filter_by_kind() {
        let store = MemoryStore::new();
        let burn = burn_record("MINT1");
        let claim = OperationRecord::open(
            OperationKind::RewardClaim,
            Some(asset("MINT1")),
            dec!(0),
            None,
        );

        OperationRepository::insert(&store, &burn).await.unwrap();
        OperationRepository::insert(&store, &claim).await.unwrap();

        let filter = OperationFilter {
            kind: Some(OperationKind::Burn),
            asset_id: None,
        };
        let listed = OperationRepository::list(&store, &filter, 10, 0).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].kind, OperationKind::Burn);
    }

    #[tokio::test]
    async fn test_operation_list_filter_by_asset() {
        let store = MemoryStore::new();
        OperationRepository::insert(&store, &burn_record("MINT1"))
            .await
            .unwrap();
        OperationRepository::insert(&store, &burn_record("MINT2"))
            .await
            .unwrap();

        let filter = OperationFilter {
            kind: None,
            asset_id: Some(asset("MINT2")),
        };
        let listed = OperationRepository::list(&store, &filter, 10, 0).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].asset_id, Some(asset("MINT2")));
    }

    #[tokio::test]
    async fn test_operation_list_paging() {
        let store = MemoryStore::new();
        for _ in 0..5 {
            OperationRepository::insert(&store, &burn_record("MINT1"))
                .await
                .unwrap();
        }

        let page1 = OperationRepository::list(&store, &OperationFilter::default(), 2, 0)
            .await
            .unwrap();
        let page2 = OperationRepository::list(&store, &OperationFilter::default(), 2, 2)
            .await
            .unwrap();
        let page3 = OperationRepository::list(&store, &OperationFilter::default(), 2, 4)
            .await
            .unwrap();

        assert_eq!(page1.len(), 2);
        assert_eq!(page2.len(), 2);
        assert_eq!(page3.len(), 1);
        assert_ne!(page1[0].id, page2[0].id);
    }

    #[tokio::test]
    async fn test_operation_list_is_idempotent() {
        let store = MemoryStore::new();
        OperationRepository::insert(&store, &burn_record("MINT1"))
            .await
            .unwrap();

        let first = OperationRepository::list(&store, &OperationFilter::default(), 10, 0)
            .await
            .unwrap();
        let second = OperationRepository::list(&store, &OperationFilter::default(), 10, 0)
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(store.operation_count(), 1);
    }

    #[tokio::test]
    async fn test_operation_count() {
        let store = MemoryStore::new();
        OperationRepository::insert(&store, &burn_record("MINT1"))
            .await
            .unwrap();
        OperationRepository::insert(&store, &burn_record("MINT2"))
            .await
            .unwrap();

        let all = OperationRepository::count(&store, &OperationFilter::default())
            .await
            .unwrap();
        assert_eq!(all, 2);

        let filter = OperationFilter {
            kind: None,
            asset_id: Some(asset("MINT1")),
        };
        let filtered = OperationRepository::count(&store, &filter).await.unwrap();
        assert_eq!(filtered, 1);
    }

    // Audit repository tests
    #[tokio::test]
    async fn test_audit_insert_and_find_by_operation() {
        let store = MemoryStore::new();
        let operation_id = Uuid::now_v7();
        let entry = AuditEntry::open(
            "burn supply",
            Some("reduce float".to_string()),
            serde_json::json!({"operation_id": operation_id.to_string(), "asset": "MINT1"}),
            OperationStatus::Pending,
        );

        AuditRepository::insert(&store, &entry).await.unwrap();

        let found = AuditRepository::find_by_operation(&store, operation_id)
            .await
            .unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().id, entry.id);
    }

    #[tokio::test]
    async fn test_audit_find_by_operation_missing() {
        let store = MemoryStore::new();
        let found = AuditRepository::find_by_operation(&store, Uuid::now_v7())
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_audit_list_recent() {
        let store = MemoryStore::new();
        for i in 0..3 {
            let entry = AuditEntry::note(
                format!("note {}", i),
                None,
                serde_json::Value::Null,
            );
            AuditRepository::insert(&store, &entry).await.unwrap();
        }

        let recent = AuditRepository::list_recent(&store, 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].action, "note 2");
    }

    // Snapshot repository tests
    #[tokio::test]
    async fn test_snapshot_insert_and_find_latest() {
        let store = MemoryStore::new();
        let older = HolderSnapshot::from_balances(
            asset("MINT1"),
            vec![(Address::new("A1").unwrap(), dec!(10))],
        );
        let newer = HolderSnapshot::from_balances(
            asset("MINT1"),
            vec![(Address::new("A1").unwrap(), dec!(20))],
        );
        let other_asset = HolderSnapshot::from_balances(
            asset("MINT2"),
            vec![(Address::new("A1").unwrap(), dec!(30))],
        );

        SnapshotRepository::insert(&store, &older).await.unwrap();
        SnapshotRepository::insert(&store, &newer).await.unwrap();
        SnapshotRepository::insert(&store, &other_asset).await.unwrap();

        let latest = SnapshotRepository::find_latest(&store, &asset("MINT1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.id, newer.id);
    }

    // Balance cache tests
    #[tokio::test]
    async fn test_balance_cache_roundtrip() {
        let store = MemoryStore::new();
        assert!(BalanceRepository::get(&store).await.unwrap().is_none());

        let balances = TreasuryBalances::new(dec!(12.5), dec!(1000000));
        BalanceRepository::put(&store, balances).await.unwrap();

        let cached = BalanceRepository::get(&store).await.unwrap().unwrap();
        assert_eq!(cached.native, dec!(12.5));
        assert_eq!(cached.asset, dec!(1000000));
    }

    // Store façade tests
    #[tokio::test]
    async fn test_store_clear() {
        let store = MemoryStore::new();
        store.operations().insert(&burn_record("MINT1")).await.unwrap();
        store
            .audit()
            .insert(&AuditEntry::note("x", None, serde_json::Value::Null))
            .await
            .unwrap();

        assert_eq!(store.operation_count(), 1);
        assert_eq!(store.audit_count(), 1);

        store.clear();

        assert_eq!(store.operation_count(), 0);
        assert_eq!(store.audit_count(), 0);
    }
}
