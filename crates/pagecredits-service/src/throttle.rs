//! Per-client throttling for public routes.
//!
//! Anonymous callers are keyed by address: the first hop in
//! `x-forwarded-for` when a proxy supplied one, else the TCP peer address,
//! else a shared `anonymous` bucket.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;

use crate::error::ApiError;
use crate::state::AppState;

/// Response header carrying the calls left in the current window.
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Bucket shared by callers with no identifiable address.
pub const ANONYMOUS_KEY: &str = "anonymous";

/// A public caller that passed the rate limit.
#[derive(Debug, Clone)]
pub struct PublicClient {
    /// Rate limit key for this caller.
    pub key: String,
    /// Calls left in the current window after this one.
    pub remaining: u64,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for PublicClient {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let key = client_key(parts);
        let limit = state.config.public_rate_limit;

        if !state.rate_limiter.check(&key, limit) {
            tracing::debug!(key = %key, limit, "Public request throttled");
            return Err(ApiError::RateLimited { limit });
        }

        let remaining = state.rate_limiter.remaining(&key, limit);
        Ok(PublicClient { key, remaining })
    }
}

/// Derive the rate limit key for a request.
#[must_use]
pub fn client_key(parts: &Parts) -> String {
    let forwarded = parts
        .headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    if let Some(addr) = forwarded {
        return addr.to_string();
    }

    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| ANONYMOUS_KEY.to_string(), |info| info.0.ip().to_string())
}
