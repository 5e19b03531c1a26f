//! Common test utilities for pagecredits service integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use axum_test::TestServer;
use chrono::{TimeZone, Utc};
use serde_json::json;

use pagecredits_core::{ManualClock, UserId};
use pagecredits_ledger::CreditLedger;
use pagecredits_service::{create_router, AppState, ServiceConfig};
use pagecredits_store::MemoryStore;

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Clock driving the ledger.
    pub clock: Arc<ManualClock>,
    /// Backing store, for assertions behind the API.
    pub store: Arc<MemoryStore>,
    /// Shared state, for assertions on the rate limiter.
    pub state: AppState,
    /// A test user ID.
    pub test_user_id: UserId,
    /// The service API key for service-to-service requests.
    pub service_api_key: String,
}

impl TestHarness {
    /// Create a new test harness with a fresh in-memory store.
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Create a harness after adjusting the default test configuration.
    pub fn with_config(adjust: impl FnOnce(&mut ServiceConfig)) -> Self {
        let service_api_key = "test-service-key".to_string();

        let mut config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            service_api_key: Some(service_api_key.clone()),
            ..ServiceConfig::default()
        };
        adjust(&mut config);

        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap(),
        ));
        let ledger = CreditLedger::new(store.clone(), clock.clone(), config.ledger_config());

        let state = AppState::with_ledger(Arc::new(ledger), config);
        let router: Router = create_router(state.clone());

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            clock,
            store,
            state,
            test_user_id: UserId::generate(),
            service_api_key,
        }
    }

    /// The `x-api-key` header name.
    pub fn api_key_name() -> HeaderName {
        HeaderName::from_static("x-api-key")
    }

    /// The valid `x-api-key` header value.
    pub fn api_key_value(&self) -> HeaderValue {
        HeaderValue::from_str(&self.service_api_key).unwrap()
    }

    /// Path under the test user's account.
    pub fn account_path(&self, suffix: &str) -> String {
        format!("/v1/accounts/{}{suffix}", self.test_user_id)
    }

    /// Open the test user's account at `tier`.
    pub async fn open_account(&self, tier: &str) {
        self.server
            .post("/v1/accounts")
            .add_header(Self::api_key_name(), self.api_key_value())
            .json(&json!({
                "user_id": self.test_user_id.to_string(),
                "tier": tier
            }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);
    }

    /// Add purchased credits to the test user.
    pub async fn purchase(&self, amount: i64) {
        self.server
            .post(&self.account_path("/credit"))
            .add_header(Self::api_key_name(), self.api_key_value())
            .json(&json!({ "amount": amount, "description": "Test funding" }))
            .await
            .assert_status_ok();
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
