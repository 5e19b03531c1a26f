//! Key encoding utilities for `RocksDB`.

use pagecredits_core::{EntryId, UserId};

/// Create an account key from a user ID.
#[must_use]
pub fn account_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Create a history key.
///
/// Format: `user_id (16 bytes) || entry_id (16 bytes)`
#[must_use]
pub fn history_key(user_id: &UserId, entry_id: &EntryId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(&entry_id.to_bytes());
    key
}

/// Create a prefix for iterating all history entries of a user.
#[must_use]
pub fn history_prefix(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}
