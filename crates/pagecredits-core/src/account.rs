//! Credit account types for pagecredits.
//!
//! One [`UserCreditAccount`] exists per user. Every mutation goes through a
//! conditional update keyed on [`UserCreditAccount::version`], described by an
//! [`AccountUpdate`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{Tier, UserId};

// ============================================================================
// Constants
// ============================================================================

/// Length of the refill eligibility window in hours.
pub const REFILL_WINDOW_HOURS: i64 = 24;

/// The default refill eligibility window.
#[must_use]
pub fn default_refill_window() -> Duration {
    Duration::hours(REFILL_WINDOW_HOURS)
}

/// A user's consumable credit balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCreditAccount {
    /// The user ID (from the auth provider).
    pub user_id: UserId,

    /// Current spendable balance. Never negative.
    pub credits: i64,

    /// Subscription tier, determines the refill allotment.
    pub tier: Tier,

    /// When the balance was last reset to the tier allotment.
    /// `None` means the account has never been refilled.
    pub last_refill_at: Option<DateTime<Utc>>,

    /// Compare-and-swap token, bumped by the store on every update.
    pub version: u64,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl UserCreditAccount {
    /// Create a new, never-refilled account with zero balance.
    #[must_use]
    pub fn new(user_id: UserId, tier: Tier, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            credits: 0,
            tier,
            last_refill_at: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the account has sufficient credits for a deduction.
    #[must_use]
    pub fn has_sufficient_credits(&self, amount: i64) -> bool {
        self.credits >= amount
    }

    /// Whether a refill is due at `now`.
    ///
    /// Only the elapsed time counts: the current balance plays no part, so
    /// unspent credits are not topped up early and purchased credits are not
    /// reset before the window closes.
    #[must_use]
    pub fn is_refill_due(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.last_refill_at
            .map_or(true, |last| now.signed_duration_since(last) >= window)
    }

    /// When the next refill becomes due, or `None` if one is due already.
    #[must_use]
    pub fn next_refill_at(&self, now: DateTime<Utc>, window: Duration) -> Option<DateTime<Utc>> {
        if self.is_refill_due(now, window) {
            return None;
        }
        self.last_refill_at.map(|last| last + window)
    }

    /// The update that resets the balance to the tier allotment at `now`.
    #[must_use]
    pub fn refill_update(&self, now: DateTime<Utc>) -> AccountUpdate {
        AccountUpdate {
            credits: self.tier.base_credits(),
            tier: self.tier,
            last_refill_at: Some(now),
            updated_at: now,
        }
    }

    /// An update that only changes the balance.
    #[must_use]
    pub fn balance_update(&self, credits: i64, now: DateTime<Utc>) -> AccountUpdate {
        AccountUpdate {
            credits,
            tier: self.tier,
            last_refill_at: self.last_refill_at,
            updated_at: now,
        }
    }

    /// An update that only changes the tier.
    #[must_use]
    pub fn tier_update(&self, tier: Tier, now: DateTime<Utc>) -> AccountUpdate {
        AccountUpdate {
            credits: self.credits,
            tier,
            last_refill_at: self.last_refill_at,
            updated_at: now,
        }
    }

    /// Apply an update as a store would after a successful compare-and-swap.
    #[must_use]
    pub fn applied(&self, update: &AccountUpdate) -> Self {
        Self {
            user_id: self.user_id,
            credits: update.credits,
            tier: update.tier,
            last_refill_at: update.last_refill_at,
            version: self.version + 1,
            created_at: self.created_at,
            updated_at: update.updated_at,
        }
    }
}

/// New mutable field values for a conditional account update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountUpdate {
    /// New balance.
    pub credits: i64,

    /// New tier.
    pub tier: Tier,

    /// New last refill timestamp.
    pub last_refill_at: Option<DateTime<Utc>>,

    /// Modification timestamp.
    pub updated_at: DateTime<Utc>,
}
