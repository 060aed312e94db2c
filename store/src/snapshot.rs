//! Snapshot storage trait.

use crate::StoreError;

/// Persists sealed ledger snapshots under string keys.
///
/// Values are opaque bytes; integrity checking is the caller's job.
pub trait SnapshotStore {
    /// Store a snapshot, replacing any previous value under `key`.
    fn put_snapshot(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;

    /// Retrieve a snapshot. Returns `StoreError::NotFound` if absent.
    fn get_snapshot(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Delete a snapshot. Deleting a missing key is not an error.
    fn delete_snapshot(&self, key: &str) -> Result<(), StoreError>;

    /// List stored snapshot keys.
    fn snapshot_keys(&self) -> Result<Vec<String>, StoreError>;
}
