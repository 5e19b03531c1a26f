//! Error types for pagecredits.

use crate::history::HistoryType;
use crate::ids::IdError;

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors that can occur in ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Non-positive (or overflowing) amount passed to a debit or credit.
    #[error("invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount.
        amount: i64,
    },

    /// Debit requested more than the current balance.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance.
        balance: i64,
        /// Required amount.
        required: i64,
    },

    /// Compare-and-swap retries exhausted under contention.
    #[error("conflicting concurrent update for {user_id} after {attempts} attempts")]
    Conflict {
        /// The contended account.
        user_id: String,
        /// Attempts made before giving up.
        attempts: u32,
    },

    /// The backing store failed or timed out.
    ///
    /// The mutation may or may not have been applied.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Account not found.
    #[error("account not found: {user_id}")]
    AccountNotFound {
        /// The user ID that was not found.
        user_id: String,
    },

    /// Account already exists.
    #[error("account already exists: {user_id}")]
    AccountAlreadyExists {
        /// The user ID that already exists.
        user_id: String,
    },

    /// History type not valid for the requested operation.
    #[error("entry type {entry_type:?} not allowed for {operation}")]
    InvalidEntryType {
        /// The rejected type.
        entry_type: HistoryType,
        /// The operation it was passed to.
        operation: &'static str,
    },

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
}

impl LedgerError {
    /// Whether the caller may retry the same request unchanged.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::StoreUnavailable(_))
    }
}
