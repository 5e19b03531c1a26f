//! In-memory storage implementation.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use pagecredits_core::{AccountUpdate, CreditHistoryEntry, UserCreditAccount, UserId};

use crate::error::{Result, StoreError};
use crate::CreditStore;

/// Process-local store backed by hash maps.
///
/// The version comparison and the write happen under one lock, which makes
/// the conditional update atomic within this process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    accounts: Mutex<HashMap<UserId, UserCreditAccount>>,
    history: Mutex<HashMap<UserId, Vec<CreditHistoryEntry>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of history entries recorded for a user.
    #[must_use]
    pub fn history_len(&self, user_id: &UserId) -> usize {
        lock(&self.history).get(user_id).map_or(0, Vec::len)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl CreditStore for MemoryStore {
    async fn get_account(&self, user_id: &UserId) -> Result<Option<UserCreditAccount>> {
        Ok(lock(&self.accounts).get(user_id).cloned())
    }

    async fn insert_account(&self, account: &UserCreditAccount) -> Result<bool> {
        let mut accounts = lock(&self.accounts);
        if accounts.contains_key(&account.user_id) {
            return Ok(false);
        }
        accounts.insert(account.user_id, account.clone());
        Ok(true)
    }

    async fn conditional_update_account(
        &self,
        user_id: &UserId,
        expected_version: u64,
        update: &AccountUpdate,
    ) -> Result<bool> {
        let mut accounts = lock(&self.accounts);
        let current = accounts.get_mut(user_id).ok_or(StoreError::NotFound)?;

        if current.version != expected_version {
            return Ok(false);
        }

        *current = current.applied(update);
        Ok(true)
    }

    async fn append_history(&self, entry: &CreditHistoryEntry) -> Result<()> {
        lock(&self.history)
            .entry(entry.user_id)
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    async fn list_history(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditHistoryEntry>> {
        let history = lock(&self.history);
        let Some(entries) = history.get(user_id) else {
            return Ok(Vec::new());
        };

        let mut entries = entries.clone();
        entries.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(entries.into_iter().skip(offset).take(limit).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pagecredits_core::Tier;

    fn account() -> UserCreditAccount {
        UserCreditAccount::new(UserId::generate(), Tier::Pro, Utc::now())
    }

    #[tokio::test]
    async fn insert_is_idempotent_per_user() {
        let store = MemoryStore::new();
        let account = account();

        assert!(store.insert_account(&account).await.unwrap());
        assert!(!store.insert_account(&account).await.unwrap());
    }

    #[tokio::test]
    async fn conditional_update_checks_version() {
        let store = MemoryStore::new();
        let account = account();
        store.insert_account(&account).await.unwrap();

        let update = account.balance_update(42, Utc::now());
        assert!(store
            .conditional_update_account(&account.user_id, 0, &update)
            .await
            .unwrap());

        // Stale version is rejected and leaves the row alone.
        let stale = account.balance_update(7, Utc::now());
        assert!(!store
            .conditional_update_account(&account.user_id, 0, &stale)
            .await
            .unwrap());

        let stored = store.get_account(&account.user_id).await.unwrap().unwrap();
        assert_eq!(stored.credits, 42);
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn conditional_update_on_missing_account() {
        let store = MemoryStore::new();
        let account = account();
        let update = account.balance_update(1, Utc::now());

        let result = store
            .conditional_update_account(&account.user_id, 0, &update)
            .await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn history_is_listed_newest_first() {
        let store = MemoryStore::new();
        let user_id = UserId::generate();

        let first = CreditHistoryEntry::purchase(user_id, 5, 5, "first".into(), Utc::now());
        store.append_history(&first).await.unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = CreditHistoryEntry::debit(user_id, 2, 3, "second".into(), Utc::now());
        store.append_history(&second).await.unwrap();

        let listed = store.list_history(&user_id, 10, 0).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].description, "second");
        assert_eq!(listed[1].description, "first");

        let page = store.list_history(&user_id, 1, 1).await.unwrap();
        assert_eq!(page[0].description, "first");
        assert_eq!(store.history_len(&user_id), 2);
    }
}
