// Path: crates/storage/src/redb_store.rs
use pchain_api::storage::{KvPair, KvStore, StorageError, WriteBatch};
use redb::{Database, ReadTransaction, ReadableTable, TableDefinition, WriteTransaction};
use std::path::Path;
use std::sync::Arc;

/// The single ledger table. Keys carry their own record-kind prefixes.
const LEDGER: TableDefinition<&[u8], &[u8]> = TableDefinition::new("LEDGER");

fn backend<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Backend(e.to_string())
}

/// A durable `KvStore` in a redb database file.
///
/// Every `write_batch` is one redb write transaction, so a batch is either
/// fully visible or not at all after a crash.
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Opens or creates the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = Database::create(path.as_ref()).map_err(backend)?;

        // Ensure the table exists so read transactions can open it.
        {
            let w = db.begin_write().map_err(backend)?;
            w.open_table(LEDGER).map_err(backend)?;
            w.commit().map_err(backend)?;
        }
        tracing::info!(
            target: "storage",
            path = %path.as_ref().display(),
            "opened redb ledger store"
        );
        Ok(Self { db: Arc::new(db) })
    }

    fn read_txn(&self) -> Result<ReadTransaction<'_>, StorageError> {
        self.db.begin_read().map_err(backend)
    }

    fn write_txn(&self) -> Result<WriteTransaction<'_>, StorageError> {
        self.db.begin_write().map_err(backend)
    }
}

impl KvStore for RedbStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let r = self.read_txn()?;
        let t = r.open_table(LEDGER).map_err(backend)?;
        let value = t.get(key).map_err(backend)?.map(|v| v.value().to_vec());
        Ok(value)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<KvPair>, StorageError> {
        self.scan_prefix_from(prefix, prefix)
    }

    fn scan_prefix_from(&self, prefix: &[u8], start: &[u8]) -> Result<Vec<KvPair>, StorageError> {
        let from = start.max(prefix);
        let r = self.read_txn()?;
        let t = r.open_table(LEDGER).map_err(backend)?;
        let mut out = Vec::new();
        for entry in t.range(from..).map_err(backend)? {
            let (k, v) = entry.map_err(backend)?;
            if !k.value().starts_with(prefix) {
                break;
            }
            out.push((k.value().to_vec(), v.value().to_vec()));
        }
        Ok(out)
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<(), StorageError> {
        let ops = batch.len();
        let w = self.write_txn()?;
        {
            let mut t = w.open_table(LEDGER).map_err(backend)?;
            for key in &batch.deletes {
                t.remove(key.as_slice()).map_err(backend)?;
            }
            for (key, value) in &batch.puts {
                t.insert(key.as_slice(), value.as_slice()).map_err(backend)?;
            }
        }
        w.commit().map_err(backend)?;
        tracing::debug!(target: "storage", ops, "wrote batch");
        Ok(())
    }
}
