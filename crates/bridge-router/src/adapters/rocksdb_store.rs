//! # RocksDB Operation Store
//!
//! Persistent `OperationStore`. Records are bincode encoded.
//!
//! ## Column Families
//!
//! - `operations` - operation id -> `Operation`
//! - `inbound` - processed inbound operation ids (value unused)
//! - `metadata` - dispatch nonce and pause flag
//!
//! A dispatch commit (record insert + nonce advance) is one `WriteBatch`.

use crate::domain::{BridgeError, Operation, OperationId};
use crate::ports::outbound::OperationStore;
use parking_lot::RwLock;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Options, WriteBatch, WriteOptions, DB};
use std::path::Path;

/// Operation records.
pub const CF_OPERATIONS: &str = "operations";
/// Processed inbound ids.
pub const CF_INBOUND: &str = "inbound";
/// Nonce and pause flag.
pub const CF_METADATA: &str = "metadata";

/// All column families used by the store.
pub const COLUMN_FAMILIES: &[&str] = &[CF_OPERATIONS, CF_INBOUND, CF_METADATA];

const KEY_NONCE: &[u8] = b"next_nonce";
const KEY_PAUSED: &[u8] = b"paused";

/// RocksDB-backed operation store.
pub struct RocksDbOperationStore {
    db: RwLock<DB>,
    sync_writes: bool,
}

fn storage_err(context: &str, e: impl std::fmt::Display) -> BridgeError {
    BridgeError::StorageError(format!("{context}: {e}"))
}

impl RocksDbOperationStore {
    /// Open or create a store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, BridgeError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = COLUMN_FAMILIES
            .iter()
            .map(|name| {
                let mut cf_opts = Options::default();
                cf_opts.set_compression_type(rocksdb::DBCompressionType::Snappy);
                ColumnFamilyDescriptor::new(*name, cf_opts)
            })
            .collect();

        let db = DB::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| storage_err("Failed to open RocksDB", e))?;

        Ok(Self {
            db: RwLock::new(db),
            sync_writes: true,
        })
    }

    /// Disable fsync on write (tests).
    pub fn without_sync(mut self) -> Self {
        self.sync_writes = false;
        self
    }

    fn write_opts(&self) -> WriteOptions {
        let mut opts = WriteOptions::default();
        opts.set_sync(self.sync_writes);
        opts
    }

    fn cf<'a>(db: &'a DB, name: &str) -> Result<&'a ColumnFamily, BridgeError> {
        db.cf_handle(name)
            .ok_or_else(|| BridgeError::StorageError(format!("missing column family {name}")))
    }

    fn read_meta(&self, key: &[u8]) -> Result<Option<Vec<u8>>, BridgeError> {
        let db = self.db.read();
        let cf = Self::cf(&db, CF_METADATA)?;
        db.get_cf(cf, key)
            .map_err(|e| storage_err("RocksDB get failed", e))
    }
}

impl OperationStore for RocksDbOperationStore {
    fn get_operation(&self, id: &OperationId) -> Result<Option<Operation>, BridgeError> {
        let db = self.db.read();
        let cf = Self::cf(&db, CF_OPERATIONS)?;
        let Some(bytes) = db
            .get_cf(cf, id.as_bytes())
            .map_err(|e| storage_err("RocksDB get failed", e))?
        else {
            return Ok(None);
        };
        bincode::deserialize(&bytes)
            .map(Some)
            .map_err(|e| storage_err("Corrupt operation record", e))
    }

    fn put_operation(&self, operation: &Operation) -> Result<(), BridgeError> {
        let db = self.db.write();
        let cf = Self::cf(&db, CF_OPERATIONS)?;
        let exists = db
            .get_cf(cf, operation.id.as_bytes())
            .map_err(|e| storage_err("RocksDB get failed", e))?
            .is_some();
        if !exists {
            return Err(BridgeError::UnknownOperation(operation.id));
        }

        let value = bincode::serialize(operation).map_err(|e| storage_err("Encode failed", e))?;
        db.put_cf_opt(cf, operation.id.as_bytes(), value, &self.write_opts())
            .map_err(|e| storage_err("RocksDB put failed", e))
    }

    fn commit_dispatch(&self, operation: &Operation, next_nonce: u64) -> Result<(), BridgeError> {
        let db = self.db.write();
        let ops = Self::cf(&db, CF_OPERATIONS)?;
        let meta = Self::cf(&db, CF_METADATA)?;

        if db
            .get_cf(ops, operation.id.as_bytes())
            .map_err(|e| storage_err("RocksDB get failed", e))?
            .is_some()
        {
            return Err(BridgeError::OperationIdCollision(operation.id));
        }

        let value = bincode::serialize(operation).map_err(|e| storage_err("Encode failed", e))?;
        let mut batch = WriteBatch::default();
        batch.put_cf(ops, operation.id.as_bytes(), value);
        batch.put_cf(meta, KEY_NONCE, next_nonce.to_be_bytes());

        db.write_opt(batch, &self.write_opts())
            .map_err(|e| storage_err("RocksDB batch write failed", e))
    }

    fn next_nonce(&self) -> Result<u64, BridgeError> {
        match self.read_meta(KEY_NONCE)? {
            None => Ok(0),
            Some(bytes) => {
                let raw: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| BridgeError::StorageError("Corrupt nonce".into()))?;
                Ok(u64::from_be_bytes(raw))
            }
        }
    }

    fn is_paused(&self) -> Result<bool, BridgeError> {
        Ok(matches!(self.read_meta(KEY_PAUSED)?.as_deref(), Some([1])))
    }

    fn set_paused(&self, paused: bool) -> Result<(), BridgeError> {
        let db = self.db.write();
        let cf = Self::cf(&db, CF_METADATA)?;
        db.put_cf_opt(cf, KEY_PAUSED, [u8::from(paused)], &self.write_opts())
            .map_err(|e| storage_err("RocksDB put failed", e))
    }

    fn mark_inbound(&self, id: &OperationId) -> Result<bool, BridgeError> {
        let db = self.db.write();
        let cf = Self::cf(&db, CF_INBOUND)?;
        if db
            .get_cf(cf, id.as_bytes())
            .map_err(|e| storage_err("RocksDB get failed", e))?
            .is_some()
        {
            return Ok(false);
        }
        db.put_cf_opt(cf, id.as_bytes(), [1u8], &self.write_opts())
            .map_err(|e| storage_err("RocksDB put failed", e))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OperationDraft, OperationStatus, OperationType, U256};
    use tempfile::TempDir;

    fn create_test_operation() -> Operation {
        let draft = OperationDraft {
            operation_type: OperationType::TransferAsset,
            source_chain: 1,
            dest_chain: 10,
            asset: [0xAA; 20],
            amount: U256::from(1_000u64),
            recipient: [2u8; 20],
            originator: [3u8; 20],
        };
        Operation::new(OperationId([7u8; 32]), &draft, [9u8; 20], 4, [1u8; 32], 100)
    }

    #[test]
    fn test_records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let op = create_test_operation();

        {
            let store = RocksDbOperationStore::open(dir.path()).unwrap().without_sync();
            store.commit_dispatch(&op, 5).unwrap();
            let mut delivered = op.clone();
            delivered.status = OperationStatus::Delivered;
            store.put_operation(&delivered).unwrap();
            store.set_paused(true).unwrap();
            assert!(store.mark_inbound(&OperationId([8u8; 32])).unwrap());
        }

        let store = RocksDbOperationStore::open(dir.path()).unwrap();
        let loaded = store.get_operation(&op.id).unwrap().unwrap();
        assert_eq!(loaded.status, OperationStatus::Delivered);
        assert_eq!(loaded.amount, U256::from(1_000u64));
        assert_eq!(loaded.assigned_adapter(), [9u8; 20]);
        assert_eq!(store.next_nonce().unwrap(), 5);
        assert!(store.is_paused().unwrap());
        assert!(!store.mark_inbound(&OperationId([8u8; 32])).unwrap());
    }

    #[test]
    fn test_collision_rejected() {
        let dir = TempDir::new().unwrap();
        let store = RocksDbOperationStore::open(dir.path()).unwrap().without_sync();
        let op = create_test_operation();

        store.commit_dispatch(&op, 1).unwrap();
        assert!(matches!(
            store.commit_dispatch(&op, 2),
            Err(BridgeError::OperationIdCollision(_))
        ));
        assert_eq!(store.next_nonce().unwrap(), 1);
    }
}
