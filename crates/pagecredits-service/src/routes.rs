//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post, put};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{accounts, credits, health, public};
use crate::state::AppState;

// ============================================================================
// Concurrency Limiting Constants
// ============================================================================

/// Maximum concurrent requests for service-authenticated account routes.
const API_MAX_CONCURRENT_REQUESTS: usize = 100;

/// Maximum concurrent requests for public routes.
const PUBLIC_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `GET /v1/public/tiers` - Tier allotments (rate limited per client)
///
/// ## Accounts (Service API Key auth)
/// - `POST /v1/accounts` - Open an account at signup
/// - `GET /v1/accounts/:user_id` - Read an account
/// - `PUT /v1/accounts/:user_id/tier` - Change tier
///
/// ## Credits (Service API Key auth)
/// - `GET /v1/accounts/:user_id/credits` - Refill check and balance
/// - `POST /v1/accounts/:user_id/debit` - Debit credits
/// - `POST /v1/accounts/:user_id/credit` - Add purchased credits
/// - `GET /v1/accounts/:user_id/history` - Credit history
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let public_routes = Router::new()
        .route("/tiers", get(public::list_tiers))
        .layer(ConcurrencyLimitLayer::new(PUBLIC_MAX_CONCURRENT_REQUESTS));

    let api_routes = Router::new()
        // Accounts
        .route("/accounts", post(accounts::create_account))
        .route("/accounts/:user_id", get(accounts::get_account))
        .route("/accounts/:user_id/tier", put(accounts::change_tier))
        // Credits
        .route("/accounts/:user_id/credits", get(credits::get_credits))
        .route("/accounts/:user_id/debit", post(credits::debit))
        .route("/accounts/:user_id/credit", post(credits::credit))
        .route("/accounts/:user_id/history", get(credits::history))
        .nest("/public", public_routes)
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        .nest("/v1", api_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
