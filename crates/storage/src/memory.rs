// Path: crates/storage/src/memory.rs
//! An in-memory ordered key-value store.

use pchain_api::storage::{KvPair, KvStore, StorageError, WriteBatch};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// A `KvStore` over a `BTreeMap`. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> StorageError {
    StorageError::Backend("memory store lock poisoned".into())
}

impl KvStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let map = self.map.read().map_err(poisoned)?;
        Ok(map.get(key).cloned())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<KvPair>, StorageError> {
        self.scan_prefix_from(prefix, prefix)
    }

    fn scan_prefix_from(&self, prefix: &[u8], start: &[u8]) -> Result<Vec<KvPair>, StorageError> {
        let from = start.max(prefix);
        let map = self.map.read().map_err(poisoned)?;
        Ok(map
            .range(from.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<(), StorageError> {
        let mut map = self.map.write().map_err(poisoned)?;
        for key in batch.deletes {
            map.remove(&key);
        }
        for (key, value) in batch.puts {
            map.insert(key, value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_conformance() {
        crate::conformance::exercise(&MemoryStore::new());
    }

    #[test]
    fn test_scan_start_below_prefix_starts_at_prefix() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::default();
        batch.put(b"a".to_vec(), vec![]);
        batch.put(b"b1".to_vec(), vec![]);
        store.write_batch(batch).unwrap();
        assert_eq!(store.scan_prefix_from(b"b", b"a").unwrap().len(), 1);
        assert!(store.scan_prefix_from(b"b", b"b2").unwrap().is_empty());
    }
}
