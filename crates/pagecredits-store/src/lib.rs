//! Storage layer for pagecredits.
//!
//! The ledger never writes an account directly. It reads a snapshot, computes
//! the new field values, and asks the store to apply them only if the stored
//! `version` still matches the snapshot (compare-and-swap). That primitive is
//! what keeps concurrent refills and debits from losing updates, across any
//! number of service instances sharing one database.
//!
//! # Backends
//!
//! - [`MemoryStore`]: process-local, for tests and single-instance development
//! - [`PgStore`]: PostgreSQL via `sqlx`, the production backend
//! - `RocksStore`: embedded `RocksDB` (feature `rocksdb-backend`)
//!
//! # Example
//!
//! ```no_run
//! # async fn demo() -> pagecredits_store::Result<()> {
//! use chrono::Utc;
//! use pagecredits_core::{Tier, UserCreditAccount, UserId};
//! use pagecredits_store::{CreditStore, MemoryStore};
//!
//! let store = MemoryStore::new();
//! let account = UserCreditAccount::new(UserId::generate(), Tier::Pro, Utc::now());
//! store.insert_account(&account).await?;
//!
//! let update = account.refill_update(Utc::now());
//! let applied = store
//!     .conditional_update_account(&account.user_id, account.version, &update)
//!     .await?;
//! assert!(applied);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
#[cfg(feature = "rocksdb-backend")]
pub mod keys;
pub mod memory;
pub mod postgres;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
#[cfg(feature = "rocksdb-backend")]
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::PgStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use async_trait::async_trait;
use pagecredits_core::{AccountUpdate, CreditHistoryEntry, UserCreditAccount, UserId};

/// The storage trait the ledger is written against.
///
/// Implementations must make [`CreditStore::conditional_update_account`]
/// atomic with respect to every other writer of the same account.
#[async_trait]
pub trait CreditStore: Send + Sync {
    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Get an account by user ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_account(&self, user_id: &UserId) -> Result<Option<UserCreditAccount>>;

    /// Insert a new account.
    ///
    /// Returns `false` without writing if the account already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn insert_account(&self, account: &UserCreditAccount) -> Result<bool>;

    /// Apply `update` only if the stored version equals `expected_version`.
    ///
    /// On success the stored version becomes `expected_version + 1` and
    /// `true` is returned. A version mismatch returns `false` and writes
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the account doesn't exist.
    async fn conditional_update_account(
        &self,
        user_id: &UserId,
        expected_version: u64,
        update: &AccountUpdate,
    ) -> Result<bool>;

    // =========================================================================
    // History Operations
    // =========================================================================

    /// Append a history entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn append_history(&self, entry: &CreditHistoryEntry) -> Result<()>;

    /// List history entries for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_history(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditHistoryEntry>>;
}
