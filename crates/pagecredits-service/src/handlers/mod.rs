//! HTTP request handlers.

pub mod accounts;
pub mod credits;
pub mod health;
pub mod public;

use pagecredits_core::{LedgerError, UserId};

use crate::error::ApiError;

/// Parse a user ID from a path segment.
pub(crate) fn parse_user_id(raw: &str) -> Result<UserId, ApiError> {
    let user_id = raw.parse::<UserId>().map_err(LedgerError::from)?;
    Ok(user_id)
}
