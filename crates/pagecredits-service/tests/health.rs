//! Health endpoint integration tests.

mod common;

use common::TestHarness;

#[tokio::test]
async fn health_returns_ok() {
    let harness = TestHarness::new();

    let response = harness.server.get("/health").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "pagecredits");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn health_needs_no_credentials() {
    let harness = TestHarness::with_config(|config| config.service_api_key = None);

    harness.server.get("/health").await.assert_status_ok();
}
