//! Credit history entries.
//!
//! Every successful balance mutation produces exactly one entry. Entries are
//! immutable once written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EntryId, UserId};

/// An audit record of a balance change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditHistoryEntry {
    /// Unique entry ID (ULID for time-ordering).
    pub id: EntryId,

    /// The user whose balance was affected.
    pub user_id: UserId,

    /// Signed amount. Positive for refills and purchases, negative for debits.
    pub amount: i64,

    /// Kind of change.
    pub entry_type: HistoryType,

    /// Balance right after the change.
    pub balance_after: i64,

    /// Human-readable description.
    pub description: String,

    /// When the change was committed.
    pub created_at: DateTime<Utc>,
}

impl CreditHistoryEntry {
    /// Daily refill to the tier allotment.
    #[must_use]
    pub fn daily_reset(
        user_id: UserId,
        base_credits: i64,
        tier_name: &str,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EntryId::generate(),
            user_id,
            amount: base_credits,
            entry_type: HistoryType::DailyReset,
            balance_after: base_credits,
            description: format!("Daily {tier_name} credit reset"),
            created_at,
        }
    }

    /// Credits added by a confirmed purchase.
    #[must_use]
    pub fn purchase(
        user_id: UserId,
        amount: i64,
        balance_after: i64,
        description: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EntryId::generate(),
            user_id,
            amount,
            entry_type: HistoryType::Purchase,
            balance_after,
            description,
            created_at,
        }
    }

    /// Credits consumed by an operation.
    #[must_use]
    pub fn debit(
        user_id: UserId,
        amount: i64,
        balance_after: i64,
        description: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EntryId::generate(),
            user_id,
            amount: -amount.abs(), // Always negative for debits
            entry_type: HistoryType::Debit,
            balance_after,
            description,
            created_at,
        }
    }
}

/// Type of credit history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryType {
    /// Balance reset to the tier allotment.
    DailyReset,

    /// Credits bought through the payment processor.
    Purchase,

    /// Credits consumed.
    Debit,
}

impl HistoryType {
    /// Stable snake_case name, as stored.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DailyReset => "daily_reset",
            Self::Purchase => "purchase",
            Self::Debit => "debit",
        }
    }

    /// Parse a stored name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "daily_reset" => Some(Self::DailyReset),
            "purchase" => Some(Self::Purchase),
            "debit" => Some(Self::Debit),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debit_entry_is_negative() {
        let entry = CreditHistoryEntry::debit(UserId::generate(), 7, 3, "page".into(), Utc::now());
        assert_eq!(entry.amount, -7);
        assert_eq!(entry.entry_type, HistoryType::Debit);
        assert_eq!(entry.balance_after, 3);
    }

    #[test]
    fn daily_reset_entry_carries_allotment() {
        let entry = CreditHistoryEntry::daily_reset(UserId::generate(), 100, "pro", Utc::now());
        assert_eq!(entry.amount, 100);
        assert_eq!(entry.balance_after, 100);
        assert_eq!(entry.description, "Daily pro credit reset");
    }

    #[test]
    fn history_type_names() {
        for ty in [HistoryType::DailyReset, HistoryType::Purchase, HistoryType::Debit] {
            assert_eq!(HistoryType::from_name(ty.as_str()), Some(ty));
            assert_eq!(
                serde_json::to_string(&ty).unwrap(),
                format!("\"{}\"", ty.as_str())
            );
        }
        assert_eq!(HistoryType::from_name("refund"), None);
    }
}
