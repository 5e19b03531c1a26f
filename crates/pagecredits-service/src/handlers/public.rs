//! Unauthenticated handlers.

use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use pagecredits_core::{default_refill_window, Tier};

use crate::throttle::{PublicClient, RATE_LIMIT_REMAINING_HEADER};

/// One row of the pricing table.
#[derive(Debug, Serialize)]
pub struct TierInfo {
    /// Tier name.
    pub tier: Tier,
    /// Credits granted on each refill.
    pub credits_per_refill: i64,
}

/// Public tier listing.
#[derive(Debug, Serialize)]
pub struct TiersResponse {
    /// Hours between refills.
    pub refill_window_hours: i64,
    /// Every tier, lowest first.
    pub tiers: Vec<TierInfo>,
}

/// List tiers and their allotments for the pricing page.
pub async fn list_tiers(client: PublicClient) -> Response {
    let body = TiersResponse {
        refill_window_hours: default_refill_window().num_hours(),
        tiers: Tier::ALL
            .iter()
            .map(|tier| TierInfo {
                tier: *tier,
                credits_per_refill: tier.base_credits(),
            })
            .collect(),
    };

    let mut response = Json(body).into_response();
    response
        .headers_mut()
        .insert(RATE_LIMIT_REMAINING_HEADER, HeaderValue::from(client.remaining));
    response
}
