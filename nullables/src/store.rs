//! Nullable store: thread-safe in-memory snapshot storage for testing.

use std::collections::HashMap;
use std::sync::Mutex;

use tally_store::{SnapshotStore, StoreError};

/// An in-memory [`SnapshotStore`].
#[derive(Default)]
pub struct NullSnapshotStore {
    snapshots: Mutex<HashMap<String, Vec<u8>>>,
}

impl NullSnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite stored bytes in place, bypassing any sealing (for corruption tests).
    pub fn tamper(&self, key: &str, f: impl FnOnce(&mut Vec<u8>)) {
        if let Ok(mut snapshots) = self.snapshots.lock() {
            if let Some(bytes) = snapshots.get_mut(key) {
                f(bytes);
            }
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>, StoreError> {
        self.snapshots
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}

impl SnapshotStore for NullSnapshotStore {
    fn put_snapshot(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.lock()?.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn get_snapshot(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.lock()?
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn delete_snapshot(&self, key: &str) -> Result<(), StoreError> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn snapshot_keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self.lock()?.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_delete() {
        let store = NullSnapshotStore::new();
        store.put_snapshot("latest", b"abc").unwrap();
        assert_eq!(store.get_snapshot("latest").unwrap(), b"abc");
        assert_eq!(store.snapshot_keys().unwrap(), vec!["latest".to_string()]);
        store.delete_snapshot("latest").unwrap();
        assert!(matches!(
            store.get_snapshot("latest"),
            Err(StoreError::NotFound(_))
        ));
        store.delete_snapshot("latest").unwrap();
    }

    #[test]
    fn tamper_modifies_bytes() {
        let store = NullSnapshotStore::new();
        store.put_snapshot("k", &[1, 2, 3]).unwrap();
        store.tamper("k", |b| b[0] = 9);
        assert_eq!(store.get_snapshot("k").unwrap(), vec![9, 2, 3]);
    }
}
