//! Common test utilities for ledger integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use pagecredits_core::{
    AccountUpdate, CreditHistoryEntry, HistoryType, ManualClock, Tier, UserCreditAccount, UserId,
};
use pagecredits_ledger::{AuditLog, CreditLedger, LedgerConfig};
use pagecredits_store::{CreditStore, MemoryStore, Result, StoreError};

/// Fixed starting point for every test clock.
pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap()
}

/// Ledger over an in-memory store with a manual clock.
pub struct TestHarness {
    pub ledger: Arc<CreditLedger>,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::default())
    }

    pub fn with_config(config: LedgerConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(start()));
        let ledger = CreditLedger::new(store.clone(), clock.clone(), config);

        Self {
            ledger: Arc::new(ledger),
            store,
            clock,
        }
    }

    /// Open an account and return its id.
    pub async fn open(&self, tier: Tier) -> UserId {
        let user_id = UserId::generate();
        self.ledger.open_account(&user_id, tier).await.unwrap();
        user_id
    }

    /// Current stored balance.
    pub async fn balance(&self, user_id: &UserId) -> i64 {
        self.store
            .get_account(user_id)
            .await
            .unwrap()
            .unwrap()
            .credits
    }

    /// Number of history entries of one type for a user.
    pub async fn entries_of(&self, user_id: &UserId, entry_type: HistoryType) -> usize {
        self.store
            .list_history(user_id, usize::MAX, 0)
            .await
            .unwrap()
            .iter()
            .filter(|e| e.entry_type == entry_type)
            .count()
    }
}

/// Config with enough CAS attempts that `n` racing callers never exhaust them.
pub fn config_for_contention(n: u32) -> LedgerConfig {
    LedgerConfig {
        max_cas_attempts: n + 1,
        ..LedgerConfig::default()
    }
}

// ============================================================================
// Store doubles
// ============================================================================

/// Yields to the scheduler before every call, so tasks on one thread interleave
/// between read and conditional update the way remote calls would.
pub struct YieldingStore {
    pub inner: MemoryStore,
}

#[async_trait]
impl CreditStore for YieldingStore {
    async fn get_account(&self, user_id: &UserId) -> Result<Option<UserCreditAccount>> {
        tokio::task::yield_now().await;
        self.inner.get_account(user_id).await
    }

    async fn insert_account(&self, account: &UserCreditAccount) -> Result<bool> {
        self.inner.insert_account(account).await
    }

    async fn conditional_update_account(
        &self,
        user_id: &UserId,
        expected_version: u64,
        update: &AccountUpdate,
    ) -> Result<bool> {
        tokio::task::yield_now().await;
        self.inner
            .conditional_update_account(user_id, expected_version, update)
            .await
    }

    async fn append_history(&self, entry: &CreditHistoryEntry) -> Result<()> {
        self.inner.append_history(entry).await
    }

    async fn list_history(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditHistoryEntry>> {
        self.inner.list_history(user_id, limit, offset).await
    }
}

/// Every compare-and-swap loses, as if another writer always got there first
/// without touching `last_refill_at`.
pub struct ContendedStore {
    pub inner: MemoryStore,
    pub cas_calls: AtomicUsize,
}

#[async_trait]
impl CreditStore for ContendedStore {
    async fn get_account(&self, user_id: &UserId) -> Result<Option<UserCreditAccount>> {
        self.inner.get_account(user_id).await
    }

    async fn insert_account(&self, account: &UserCreditAccount) -> Result<bool> {
        self.inner.insert_account(account).await
    }

    async fn conditional_update_account(
        &self,
        _user_id: &UserId,
        _expected_version: u64,
        _update: &AccountUpdate,
    ) -> Result<bool> {
        self.cas_calls.fetch_add(1, Ordering::SeqCst);
        Ok(false)
    }

    async fn append_history(&self, entry: &CreditHistoryEntry) -> Result<()> {
        self.inner.append_history(entry).await
    }

    async fn list_history(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditHistoryEntry>> {
        self.inner.list_history(user_id, limit, offset).await
    }
}

/// A store whose backend is down.
pub struct UnavailableStore;

#[async_trait]
impl CreditStore for UnavailableStore {
    async fn get_account(&self, _user_id: &UserId) -> Result<Option<UserCreditAccount>> {
        Err(StoreError::Database("connection refused".into()))
    }

    async fn insert_account(&self, _account: &UserCreditAccount) -> Result<bool> {
        Err(StoreError::Database("connection refused".into()))
    }

    async fn conditional_update_account(
        &self,
        _user_id: &UserId,
        _expected_version: u64,
        _update: &AccountUpdate,
    ) -> Result<bool> {
        Err(StoreError::Database("connection refused".into()))
    }

    async fn append_history(&self, _entry: &CreditHistoryEntry) -> Result<()> {
        Err(StoreError::Database("connection refused".into()))
    }

    async fn list_history(
        &self,
        _user_id: &UserId,
        _limit: usize,
        _offset: usize,
    ) -> Result<Vec<CreditHistoryEntry>> {
        Err(StoreError::Database("connection refused".into()))
    }
}

/// Reads hang far longer than any sane timeout.
pub struct StalledStore {
    pub inner: MemoryStore,
}

#[async_trait]
impl CreditStore for StalledStore {
    async fn get_account(&self, user_id: &UserId) -> Result<Option<UserCreditAccount>> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        self.inner.get_account(user_id).await
    }

    async fn insert_account(&self, account: &UserCreditAccount) -> Result<bool> {
        self.inner.insert_account(account).await
    }

    async fn conditional_update_account(
        &self,
        user_id: &UserId,
        expected_version: u64,
        update: &AccountUpdate,
    ) -> Result<bool> {
        self.inner
            .conditional_update_account(user_id, expected_version, update)
            .await
    }

    async fn append_history(&self, entry: &CreditHistoryEntry) -> Result<()> {
        self.inner.append_history(entry).await
    }

    async fn list_history(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditHistoryEntry>> {
        self.inner.list_history(user_id, limit, offset).await
    }
}

/// Audit sink that always fails.
#[derive(Default)]
pub struct FailingAuditLog {
    pub attempts: AtomicUsize,
}

#[async_trait]
impl AuditLog for FailingAuditLog {
    async fn append(&self, _entry: &CreditHistoryEntry) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Database("history table unavailable".into()))
    }
}
