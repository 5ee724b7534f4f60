//! Holder snapshot capture.
//!
//! Reads the current holder list from the directory port, computes each
//! holder's share, and persists the immutable snapshot. Snapshots are only
//! ever inputs to distribution planning.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::info;

use bursar_domain::{AssetId, HolderSnapshot, SnapshotId};
use bursar_store::Store;

use crate::error::{ExecError, ExecResult};
use crate::ports::HolderDirectory;

/// Captures and reads holder snapshots.
pub struct SnapshotService<D: HolderDirectory, S: Store> {
    directory: Arc<D>,
    store: Arc<S>,
    call_timeout: Duration,
}

impl<D: HolderDirectory, S: Store> SnapshotService<D, S> {
    /// Create a snapshot service.
    pub fn new(directory: Arc<D>, store: Arc<S>, call_timeout: Duration) -> Self {
        Self {
            directory,
            store,
            call_timeout,
        }
    }

    /// Capture the holder list for an asset at the time of call and
    /// persist it as a new snapshot.
    ///
    /// # Errors
    /// Returns `ExecError::UpstreamUnavailable` if the directory cannot be
    /// read within the bounded wait.
    pub async fn capture(&self, asset: &AssetId) -> ExecResult<HolderSnapshot> {
        let balances = match timeout(self.call_timeout, self.directory.list_holders(asset)).await {
            Ok(Ok(balances)) => balances,
            Ok(Err(e)) => return Err(ExecError::UpstreamUnavailable(e.to_string())),
            Err(_) => {
                return Err(ExecError::UpstreamUnavailable(
                    "holder directory timed out".to_string(),
                ))
            }
        };

        let snapshot = HolderSnapshot::from_balances(asset.clone(), balances);
        self.store.snapshots().insert(&snapshot).await?;

        info!(
            snapshot_id = %snapshot.id,
            asset = %asset,
            holders = snapshot.holder_count,
            total_held = %snapshot.total_held,
            "Holder snapshot captured"
        );
        Ok(snapshot)
    }

    /// Read a snapshot by id.
    pub async fn get(&self, id: SnapshotId) -> ExecResult<Option<HolderSnapshot>> {
        Ok(self.store.snapshots().find_by_id(id).await?)
    }

    /// Read the most recently captured snapshot for an asset.
    pub async fn latest(&self, asset: &AssetId) -> ExecResult<Option<HolderSnapshot>> {
        Ok(self.store.snapshots().find_latest(asset).await?)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::StubHolderDirectory;
    use bursar_domain::Address;
    use bursar_store::MemoryStore;
    use rust_decimal_macros::dec;

    fn asset() -> AssetId {
        AssetId::new("MINT1").unwrap()
    }

    fn service_with(
        directory: Arc<StubHolderDirectory>,
    ) -> (SnapshotService<StubHolderDirectory, MemoryStore>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let service = SnapshotService::new(directory, store.clone(), Duration::from_secs(5));
        (service, store)
    }

    #[tokio::test]
    async fn test_capture_persists_snapshot_with_shares() {
        let directory = Arc::new(StubHolderDirectory::new());
        directory.set_holders(
            &asset(),
            vec![
                (Address::new("A1").unwrap(), dec!(70)),
                (Address::new("B2").unwrap(), dec!(30)),
            ],
        );
        let (service, store) = service_with(directory);

        let snapshot = service.capture(&asset()).await.unwrap();

        assert_eq!(snapshot.holder_count, 2);
        assert_eq!(snapshot.total_held, dec!(100));
        assert_eq!(snapshot.holders[0].percentage, dec!(70.0000));

        assert_eq!(store.snapshot_count(), 1);
        let fetched = service.get(snapshot.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, snapshot.id);
    }

    #[tokio::test]
    async fn test_capture_directory_outage() {
        let directory = Arc::new(StubHolderDirectory::new());
        directory.set_fail_next(true);
        let (service, store) = service_with(directory);

        let result = service.capture(&asset()).await;
        assert!(matches!(result, Err(ExecError::UpstreamUnavailable(_))));
        assert_eq!(store.snapshot_count(), 0);
    }

    #[tokio::test]
    async fn test_latest_returns_newest() {
        let directory = Arc::new(StubHolderDirectory::new());
        directory.set_holders(&asset(), vec![(Address::new("A1").unwrap(), dec!(10))]);
        let (service, _store) = service_with(directory);

        let first = service.capture(&asset()).await.unwrap();
        let second = service.capture(&asset()).await.unwrap();
        assert_ne!(first.id, second.id);

        let latest = service.latest(&asset()).await.unwrap().unwrap();
        assert_eq!(latest.id, second.id);
    }
}
