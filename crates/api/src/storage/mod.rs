// Path: crates/api/src/storage/mod.rs

//! API for the durable key-value store the ledger persists into.
//!
//! The store is a single ordered key space. Scans return entries in raw key
//! byte order, which the persisted key layout relies on.

use pchain_types::error::StateError;
use thiserror::Error;

/// A type alias for a block height.
pub type Height = u64;

/// An owned key-value pair read from the store.
pub type KvPair = (Vec<u8>, Vec<u8>);

/// Encodes a u64 into a big-endian byte array, suitable for ordered key scans.
#[inline]
pub fn be64(x: u64) -> [u8; 8] {
    x.to_be_bytes()
}

/// Represents errors that can occur within the durable storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A generic error originating from the underlying key-value store backend (e.g., redb).
    #[error("backend error: {0}")]
    Backend(String),
    /// An error occurred while serializing data for storage.
    #[error("encode error: {0}")]
    Encode(String),
    /// An error occurred while deserializing data from storage.
    #[error("decode error: {0}")]
    Decode(String),
    /// The requested key or item was not found in the store.
    #[error("not found")]
    NotFound,
}

impl From<StorageError> for StateError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Decode(msg) => StateError::Decode(msg),
            StorageError::NotFound => StateError::NotFound("storage record".into()),
            other => StateError::Backend(other.to_string()),
        }
    }
}

/// Writes and deletes committed atomically by [`KvStore::write_batch`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WriteBatch {
    /// Keys to insert or overwrite.
    pub puts: Vec<KvPair>,
    /// Keys to remove.
    pub deletes: Vec<Vec<u8>>,
}

impl WriteBatch {
    /// Queues an insert.
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.puts.push((key, value));
    }

    /// Queues a delete.
    pub fn delete(&mut self, key: Vec<u8>) {
        self.deletes.push(key);
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.puts.is_empty() && self.deletes.is_empty()
    }

    /// Number of queued operations.
    pub fn len(&self) -> usize {
        self.puts.len() + self.deletes.len()
    }
}

/// An ordered, durable key-value store.
///
/// Implementations must be safe to share across threads; writes become
/// visible to readers only once a whole batch has committed.
pub trait KvStore: Send + Sync {
    /// Returns the value stored under `key`.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Returns every entry whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<KvPair>, StorageError>;

    /// Returns every entry whose key starts with `prefix` and is not below
    /// `start`, in key order.
    fn scan_prefix_from(&self, prefix: &[u8], start: &[u8]) -> Result<Vec<KvPair>, StorageError>;

    /// Atomically applies a batch. Deletes are applied before puts.
    fn write_batch(&self, batch: WriteBatch) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_errors_map_onto_state_errors() {
        assert!(matches!(
            StateError::from(StorageError::Decode("x".into())),
            StateError::Decode(_)
        ));
        assert!(StateError::from(StorageError::NotFound).is_not_found());
        assert!(matches!(
            StateError::from(StorageError::Backend("io".into())),
            StateError::Backend(_)
        ));
    }

    #[test]
    fn test_write_batch_counts_operations() {
        let mut batch = WriteBatch::default();
        assert!(batch.is_empty());
        batch.put(b"a".to_vec(), b"1".to_vec());
        batch.delete(b"b".to_vec());
        assert_eq!(batch.len(), 2);
    }
}
