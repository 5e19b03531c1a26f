//! pagecredits HTTP API service.
//!
//! This crate exposes the credit ledger over HTTP:
//!
//! - Account signup and tier changes
//! - Daily refill check, debits and purchased credits
//! - Credit history
//! - A rate-limited public endpoint for anonymous callers
//!
//! # Authentication
//!
//! Account routes are called by the page generator backend and the payment
//! webhook handler, never by browsers. They require the shared service API
//! key in `x-api-key`. Public routes carry no credentials and are throttled
//! per client address instead.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers are async for axum even when they don't await

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod throttle;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
