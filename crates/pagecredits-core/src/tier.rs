//! Subscription tiers and their daily credit allotments.
//!
//! The tier set is closed. Anything that arrives from outside (a database
//! column, a webhook payload) and does not name a known tier is read as
//! [`Tier::Free`], so a misclassified account can never be granted more than
//! the lowest allotment.

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Free tier credits granted per refill window.
pub const FREE_TIER_CREDITS: i64 = 10;

/// Pro tier credits granted per refill window.
pub const PRO_TIER_CREDITS: i64 = 100;

/// Ultra tier credits granted per refill window.
pub const ULTRA_TIER_CREDITS: i64 = 500;

/// Subscription tier of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Tier {
    /// No subscription.
    #[default]
    Free,

    /// Pro subscription.
    Pro,

    /// Ultra subscription.
    Ultra,
}

impl Tier {
    /// All tiers, lowest first.
    pub const ALL: [Tier; 3] = [Tier::Free, Tier::Pro, Tier::Ultra];

    /// Credits the balance is reset to on each daily refill.
    #[must_use]
    pub const fn base_credits(&self) -> i64 {
        match self {
            Self::Free => FREE_TIER_CREDITS,
            Self::Pro => PRO_TIER_CREDITS,
            Self::Ultra => ULTRA_TIER_CREDITS,
        }
    }

    /// Parse a tier name, falling back to `Free` for anything unrecognized.
    ///
    /// Matching ignores ASCII case and surrounding whitespace.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let name = name.trim();
        if name.eq_ignore_ascii_case("pro") {
            Self::Pro
        } else if name.eq_ignore_ascii_case("ultra") {
            Self::Ultra
        } else {
            Self::Free
        }
    }

    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
            Self::Ultra => "ultra",
        }
    }
}

/// Base allotment for a raw tier name, defaulting to the free allotment.
#[must_use]
pub fn base_credits_for(name: &str) -> i64 {
    Tier::from_name(name).base_credits()
}

impl From<String> for Tier {
    fn from(value: String) -> Self {
        Self::from_name(&value)
    }
}

impl From<Tier> for String {
    fn from(tier: Tier) -> Self {
        tier.as_str().to_string()
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
