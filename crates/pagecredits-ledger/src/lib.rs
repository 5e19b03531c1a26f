//! Credit ledger and anonymous rate limiter for pagecredits.
//!
//! - [`CreditLedger`] refills balances once per 24-hour window, debits
//!   without ever going negative, and adds purchased credits. All writes go
//!   through the store's compare-and-swap, so concurrent requests for the
//!   same user (on any number of instances) cannot double-refill or lose a
//!   debit.
//! - [`AuditLog`] receives one history entry per successful mutation.
//! - [`RateLimiter`] is a per-process, periodically reset request counter for
//!   public endpoints.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod audit;
pub mod ledger;
pub mod rate_limit;

pub use audit::{AuditLog, StoreAuditLog};
pub use ledger::{
    CreditLedger, DebitOutcome, LedgerConfig, RefreshOutcome, DEFAULT_MAX_CAS_ATTEMPTS,
    DEFAULT_STORE_TIMEOUT,
};
pub use rate_limit::{RateLimiter, DEFAULT_RESET_INTERVAL};
