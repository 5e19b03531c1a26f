//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Credit account records, keyed by `user_id`.
    pub const ACCOUNTS: &str = "credit_accounts";

    /// History entries, keyed by `user_id || entry_id`.
    ///
    /// Entry ids are ULIDs, so a prefix scan over one user yields entries in
    /// chronological order.
    pub const HISTORY: &str = "credit_history";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![cf::ACCOUNTS, cf::HISTORY]
}
