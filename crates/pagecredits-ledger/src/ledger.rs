//! The credit ledger.
//!
//! Every balance change follows the same shape: read a snapshot, decide,
//! then write through the store's version-checked update. Losing that
//! compare-and-swap means another request changed the account in between,
//! and the ledger re-reads before deciding again. There is no in-process
//! lock: instances sharing one database coordinate only through the store.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pagecredits_core::{
    AccountUpdate, Clock, CreditHistoryEntry, HistoryType, LedgerError, Result, Tier,
    UserCreditAccount, UserId,
};
use pagecredits_store::{CreditStore, StoreError};

use crate::audit::{AuditLog, StoreAuditLog};

// ============================================================================
// Constants
// ============================================================================

/// Default number of compare-and-swap attempts before reporting `Conflict`.
pub const DEFAULT_MAX_CAS_ATTEMPTS: u32 = 8;

/// Default upper bound on a single store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Ledger tuning knobs.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Minimum time between two refills of the same account.
    pub refill_window: chrono::Duration,

    /// Compare-and-swap attempts per operation before giving up.
    pub max_cas_attempts: u32,

    /// Upper bound on each store call. Elapsed calls become `StoreUnavailable`.
    pub store_timeout: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            refill_window: pagecredits_core::default_refill_window(),
            max_cas_attempts: DEFAULT_MAX_CAS_ATTEMPTS,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}

/// Result of [`CreditLedger::check_and_refresh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshOutcome {
    /// Balance after the call.
    pub credits: i64,

    /// Whether this call performed the refill.
    pub refreshed: bool,
}

/// Result of [`CreditLedger::debit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitOutcome {
    /// The amount was taken.
    Debited {
        /// Balance after the debit.
        remaining: i64,
    },

    /// The balance was too low. Nothing was changed.
    InsufficientCredits {
        /// Balance at the time of the check.
        balance: i64,
        /// Amount that was requested.
        required: i64,
    },
}

impl DebitOutcome {
    /// Whether the debit was applied.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self, Self::Debited { .. })
    }

    /// Balance after the call.
    #[must_use]
    pub const fn remaining(&self) -> i64 {
        match self {
            Self::Debited { remaining } => *remaining,
            Self::InsufficientCredits { balance, .. } => *balance,
        }
    }

    /// Convert to a `Result`, turning insufficient funds into an error.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InsufficientCredits` if the debit was refused.
    pub fn into_result(self) -> Result<i64> {
        match self {
            Self::Debited { remaining } => Ok(remaining),
            Self::InsufficientCredits { balance, required } => {
                Err(LedgerError::InsufficientCredits { balance, required })
            }
        }
    }
}

/// Orchestrates refills, debits and purchases against a [`CreditStore`].
pub struct CreditLedger {
    store: Arc<dyn CreditStore>,
    audit: Arc<dyn AuditLog>,
    clock: Arc<dyn Clock>,
    config: LedgerConfig,
    audit_failures: AtomicU64,
}

impl CreditLedger {
    /// Create a ledger that audits into the same store.
    #[must_use]
    pub fn new(store: Arc<dyn CreditStore>, clock: Arc<dyn Clock>, config: LedgerConfig) -> Self {
        let audit = Arc::new(StoreAuditLog::new(Arc::clone(&store)));
        Self {
            store,
            audit,
            clock,
            config,
            audit_failures: AtomicU64::new(0),
        }
    }

    /// Replace the audit sink.
    #[must_use]
    pub fn with_audit_log(mut self, audit: Arc<dyn AuditLog>) -> Self {
        self.audit = audit;
        self
    }

    /// When the account's next refill becomes due, or `None` if it is due now.
    #[must_use]
    pub fn next_refill_at(
        &self,
        account: &UserCreditAccount,
    ) -> Option<chrono::DateTime<chrono::Utc>> {
        account.next_refill_at(self.clock.now(), self.config.refill_window)
    }

    /// Number of history entries that could not be written since startup.
    #[must_use]
    pub fn audit_failures(&self) -> u64 {
        self.audit_failures.load(Ordering::Relaxed)
    }

    // =========================================================================
    // Account lifecycle
    // =========================================================================

    /// Create the account for a newly signed-up user.
    ///
    /// The account starts empty and never refilled, so the first
    /// [`check_and_refresh`](Self::check_and_refresh) grants the allotment.
    ///
    /// # Errors
    ///
    /// Returns `AccountAlreadyExists` if the user already has an account.
    pub async fn open_account(&self, user_id: &UserId, tier: Tier) -> Result<UserCreditAccount> {
        let account = UserCreditAccount::new(*user_id, tier, self.clock.now());

        let inserted = self
            .store_call(user_id, self.store.insert_account(&account))
            .await?;
        if !inserted {
            return Err(LedgerError::AccountAlreadyExists {
                user_id: user_id.to_string(),
            });
        }

        tracing::info!(user_id = %user_id, tier = %tier, "Credit account opened");
        Ok(account)
    }

    /// Read an account.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` or `StoreUnavailable`.
    pub async fn account(&self, user_id: &UserId) -> Result<UserCreditAccount> {
        self.load(user_id).await
    }

    /// List history entries for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store fails.
    pub async fn history(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditHistoryEntry>> {
        self.store_call(user_id, self.store.list_history(user_id, limit, offset))
            .await
    }

    /// Move an account to another tier.
    ///
    /// The balance is left alone; the new allotment applies from the next
    /// refill.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound`, `Conflict` or `StoreUnavailable`.
    pub async fn change_tier(&self, user_id: &UserId, tier: Tier) -> Result<UserCreditAccount> {
        for attempt in 1..=self.config.max_cas_attempts {
            let account = self.load(user_id).await?;
            if account.tier == tier {
                return Ok(account);
            }

            let update = account.tier_update(tier, self.clock.now());
            if self.compare_and_swap(&account, &update).await? {
                tracing::info!(
                    user_id = %user_id,
                    from = %account.tier,
                    to = %tier,
                    "Account tier changed"
                );
                return Ok(account.applied(&update));
            }

            tracing::debug!(user_id = %user_id, attempt, "Tier change lost compare-and-swap");
            tokio::task::yield_now().await;
        }

        Err(self.conflict(user_id, "change_tier"))
    }

    // =========================================================================
    // Balance operations
    // =========================================================================

    /// Refill the balance to the tier allotment if the refill window has passed.
    ///
    /// Eligibility depends only on time since the last refill. If a
    /// concurrent request performs the refill first, this call returns the
    /// winner's result with `refreshed = false` instead of refilling again.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound`, `Conflict` or `StoreUnavailable`.
    pub async fn check_and_refresh(&self, user_id: &UserId) -> Result<RefreshOutcome> {
        let mut account = self.load(user_id).await?;

        for attempt in 1..=self.config.max_cas_attempts {
            let now = self.clock.now();
            if !account.is_refill_due(now, self.config.refill_window) {
                tracing::debug!(
                    user_id = %user_id,
                    credits = account.credits,
                    "Refill not due"
                );
                return Ok(RefreshOutcome {
                    credits: account.credits,
                    refreshed: false,
                });
            }

            let update = account.refill_update(now);
            if self.compare_and_swap(&account, &update).await? {
                let base = update.credits;
                tracing::info!(
                    user_id = %user_id,
                    tier = %account.tier,
                    previous_credits = account.credits,
                    credits = base,
                    "Daily credits refilled"
                );
                self.record(CreditHistoryEntry::daily_reset(
                    *user_id,
                    base,
                    account.tier.as_str(),
                    now,
                ))
                .await;
                return Ok(RefreshOutcome {
                    credits: base,
                    refreshed: true,
                });
            }

            let observed = account.last_refill_at;
            account = self.load(user_id).await?;
            if account.last_refill_at != observed {
                // Someone else refilled this window.
                tracing::debug!(user_id = %user_id, "Refill performed by concurrent request");
                return Ok(RefreshOutcome {
                    credits: account.credits,
                    refreshed: false,
                });
            }

            tracing::debug!(user_id = %user_id, attempt, "Refill lost compare-and-swap");
            tokio::task::yield_now().await;
        }

        Err(self.conflict(user_id, "check_and_refresh"))
    }

    /// Take `amount` credits from the balance.
    ///
    /// Never leaves the balance negative and never debits partially.
    /// Insufficient funds is a normal outcome, not an error.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` for non-positive amounts, `InvalidEntryType`
    /// unless `entry_type` is `Debit`, and `AccountNotFound`, `Conflict` or
    /// `StoreUnavailable` from the store path.
    pub async fn debit(
        &self,
        user_id: &UserId,
        amount: i64,
        entry_type: HistoryType,
        description: &str,
    ) -> Result<DebitOutcome> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount { amount });
        }
        if entry_type != HistoryType::Debit {
            return Err(LedgerError::InvalidEntryType {
                entry_type,
                operation: "debit",
            });
        }

        for attempt in 1..=self.config.max_cas_attempts {
            let account = self.load(user_id).await?;
            if !account.has_sufficient_credits(amount) {
                tracing::debug!(
                    user_id = %user_id,
                    balance = account.credits,
                    required = amount,
                    "Debit refused: insufficient credits"
                );
                return Ok(DebitOutcome::InsufficientCredits {
                    balance: account.credits,
                    required: amount,
                });
            }

            let now = self.clock.now();
            let remaining = account.credits - amount;
            let update = account.balance_update(remaining, now);
            if self.compare_and_swap(&account, &update).await? {
                tracing::info!(
                    user_id = %user_id,
                    amount,
                    remaining,
                    "Credits debited"
                );
                self.record(CreditHistoryEntry::debit(
                    *user_id,
                    amount,
                    remaining,
                    description.to_string(),
                    now,
                ))
                .await;
                return Ok(DebitOutcome::Debited { remaining });
            }

            tracing::debug!(user_id = %user_id, attempt, "Debit lost compare-and-swap");
            tokio::task::yield_now().await;
        }

        Err(self.conflict(user_id, "debit"))
    }

    /// Add purchased credits to the balance. Returns the new balance.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` for non-positive amounts or if the balance
    /// would overflow, `InvalidEntryType` unless `entry_type` is `Purchase`,
    /// and `AccountNotFound`, `Conflict` or `StoreUnavailable` from the
    /// store path.
    pub async fn credit(
        &self,
        user_id: &UserId,
        amount: i64,
        entry_type: HistoryType,
        description: &str,
    ) -> Result<i64> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount { amount });
        }
        if entry_type != HistoryType::Purchase {
            return Err(LedgerError::InvalidEntryType {
                entry_type,
                operation: "credit",
            });
        }

        for attempt in 1..=self.config.max_cas_attempts {
            let account = self.load(user_id).await?;
            let balance = account
                .credits
                .checked_add(amount)
                .ok_or(LedgerError::InvalidAmount { amount })?;

            let now = self.clock.now();
            let update = account.balance_update(balance, now);
            if self.compare_and_swap(&account, &update).await? {
                tracing::info!(user_id = %user_id, amount, balance, "Credits purchased");
                self.record(CreditHistoryEntry::purchase(
                    *user_id,
                    amount,
                    balance,
                    description.to_string(),
                    now,
                ))
                .await;
                return Ok(balance);
            }

            tracing::debug!(user_id = %user_id, attempt, "Credit lost compare-and-swap");
            tokio::task::yield_now().await;
        }

        Err(self.conflict(user_id, "credit"))
    }

    // =========================================================================
    // Store plumbing
    // =========================================================================

    async fn load(&self, user_id: &UserId) -> Result<UserCreditAccount> {
        self.store_call(user_id, self.store.get_account(user_id))
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound {
                user_id: user_id.to_string(),
            })
    }

    async fn compare_and_swap(
        &self,
        account: &UserCreditAccount,
        update: &AccountUpdate,
    ) -> Result<bool> {
        debug_assert!(update.credits >= 0, "balance must never go negative");
        self.store_call(
            &account.user_id,
            self.store
                .conditional_update_account(&account.user_id, account.version, update),
        )
        .await
    }

    /// Run a store call under the configured timeout and map its failure.
    async fn store_call<T, F>(&self, user_id: &UserId, call: F) -> Result<T>
    where
        F: Future<Output = pagecredits_store::Result<T>>,
    {
        let outcome = tokio::time::timeout(self.config.store_timeout, call)
            .await
            .unwrap_or(Err(StoreError::Timeout));

        outcome.map_err(|err| match err {
            StoreError::NotFound => LedgerError::AccountNotFound {
                user_id: user_id.to_string(),
            },
            other => {
                tracing::warn!(user_id = %user_id, error = %other, "Credit store call failed");
                LedgerError::StoreUnavailable(other.to_string())
            }
        })
    }

    /// Append to the audit log. Failures are reported, never propagated.
    async fn record(&self, entry: CreditHistoryEntry) {
        let appended = tokio::time::timeout(self.config.store_timeout, self.audit.append(&entry))
            .await
            .unwrap_or(Err(StoreError::Timeout));

        if let Err(err) = appended {
            self.audit_failures.fetch_add(1, Ordering::Relaxed);
            tracing::error!(
                user_id = %entry.user_id,
                entry_id = %entry.id,
                entry_type = entry.entry_type.as_str(),
                amount = entry.amount,
                error = %err,
                "Failed to append credit history entry"
            );
        }
    }

    fn conflict(&self, user_id: &UserId, operation: &'static str) -> LedgerError {
        tracing::warn!(
            user_id = %user_id,
            operation,
            attempts = self.config.max_cas_attempts,
            "Compare-and-swap retries exhausted"
        );
        LedgerError::Conflict {
            user_id: user_id.to_string(),
            attempts: self.config.max_cas_attempts,
        }
    }
}
