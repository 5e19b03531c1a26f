//! Application state.

use std::sync::Arc;

use pagecredits_core::SystemClock;
use pagecredits_ledger::{CreditLedger, RateLimiter};
use pagecredits_store::CreditStore;

use crate::config::ServiceConfig;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The credit ledger.
    pub ledger: Arc<CreditLedger>,

    /// Throttle for public routes.
    pub rate_limiter: Arc<RateLimiter>,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Build state over `store` with the system clock.
    ///
    /// Must be called inside a Tokio runtime; it starts the rate limiter's
    /// reset timer.
    #[must_use]
    pub fn new(store: Arc<dyn CreditStore>, config: ServiceConfig) -> Self {
        let ledger = CreditLedger::new(store, Arc::new(SystemClock), config.ledger_config());
        Self::with_ledger(Arc::new(ledger), config)
    }

    /// Build state around an existing ledger.
    #[must_use]
    pub fn with_ledger(ledger: Arc<CreditLedger>, config: ServiceConfig) -> Self {
        if config.service_api_key.is_none() {
            tracing::warn!("SERVICE_API_KEY not set - account routes will reject every request");
        }

        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit_reset_interval()));

        Self {
            ledger,
            rate_limiter,
            config,
        }
    }
}
