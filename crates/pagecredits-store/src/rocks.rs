//! `RocksDB` storage implementation.
//!
//! `RocksDB` holds an exclusive lock on its directory, so one process owns the
//! data. The conditional update compares and writes under a store-internal
//! write lock, which is enough to make it atomic for that process.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options,
};

use pagecredits_core::{AccountUpdate, CreditHistoryEntry, UserCreditAccount, UserId};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::CreditStore;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn read_account(&self, user_id: &UserId) -> Result<Option<UserCreditAccount>> {
        let cf = self.cf(cf::ACCOUNTS)?;
        self.db
            .get_cf(&cf, keys::account_key(user_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn write_account(&self, account: &UserCreditAccount) -> Result<()> {
        let cf = self.cf(cf::ACCOUNTS)?;
        let value = Self::serialize(account)?;
        self.db
            .put_cf(&cf, keys::account_key(&account.user_id), value)
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

#[async_trait]
impl CreditStore for RocksStore {
    async fn get_account(&self, user_id: &UserId) -> Result<Option<UserCreditAccount>> {
        self.read_account(user_id)
    }

    async fn insert_account(&self, account: &UserCreditAccount) -> Result<bool> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        if self.read_account(&account.user_id)?.is_some() {
            return Ok(false);
        }
        self.write_account(account)?;
        Ok(true)
    }

    async fn conditional_update_account(
        &self,
        user_id: &UserId,
        expected_version: u64,
        update: &AccountUpdate,
    ) -> Result<bool> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let current = self.read_account(user_id)?.ok_or(StoreError::NotFound)?;
        if current.version != expected_version {
            return Ok(false);
        }

        self.write_account(&current.applied(update))?;
        Ok(true)
    }

    async fn append_history(&self, entry: &CreditHistoryEntry) -> Result<()> {
        let cf = self.cf(cf::HISTORY)?;
        let key = keys::history_key(&entry.user_id, &entry.id);
        let value = Self::serialize(entry)?;

        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    async fn list_history(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditHistoryEntry>> {
        let cf = self.cf(cf::HISTORY)?;
        let prefix = keys::history_prefix(user_id);

        // Keys are time-ordered within the prefix; collect then reverse for newest first.
        let mut entries = Vec::new();
        for item in self
            .db
            .iterator_cf(&cf, IteratorMode::From(&prefix, Direction::Forward))
        {
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            entries.push(value);
        }

        entries
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .map(|data| Self::deserialize(data))
            .collect()
    }
}
