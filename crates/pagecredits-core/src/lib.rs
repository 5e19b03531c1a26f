//! Core types and utilities for pagecredits.
//!
//! This crate provides the foundational types shared by the ledger, the
//! stores, and the HTTP service:
//!
//! - **Identifiers**: `UserId`, `EntryId`
//! - **Accounts**: `UserCreditAccount`, `AccountUpdate`
//! - **Tiers**: `Tier` and the per-tier daily allotment
//! - **History**: `CreditHistoryEntry`, `HistoryType`
//! - **Time**: `Clock`, `SystemClock`, `ManualClock`
//!
//! # Credits
//!
//! Credits are whole units stored as `i64`. A balance is never negative.
//! Each account is reset to its tier allotment at most once per 24 hours.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod clock;
pub mod error;
pub mod history;
pub mod ids;
pub mod tier;

pub use account::{default_refill_window, AccountUpdate, UserCreditAccount, REFILL_WINDOW_HOURS};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{LedgerError, Result};
pub use history::{CreditHistoryEntry, HistoryType};
pub use ids::{EntryId, IdError, UserId};
pub use tier::{
    base_credits_for, Tier, FREE_TIER_CREDITS, PRO_TIER_CREDITS, ULTRA_TIER_CREDITS,
};
