//! Refill, debit and purchase integration tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use pagecredits_core::HistoryType;
use serde_json::json;

async fn refresh(harness: &TestHarness) -> serde_json::Value {
    let response = harness
        .server
        .get(&harness.account_path("/credits"))
        .add_header(TestHarness::api_key_name(), harness.api_key_value())
        .await;
    response.assert_status_ok();
    response.json()
}

// ============================================================================
// Refill
// ============================================================================

#[tokio::test]
async fn first_balance_check_refills() {
    let harness = TestHarness::new();
    harness.open_account("pro").await;

    let body = refresh(&harness).await;
    assert_eq!(body["credits"], 100);
    assert_eq!(body["refreshed"], true);

    let body = refresh(&harness).await;
    assert_eq!(body["credits"], 100);
    assert_eq!(body["refreshed"], false);
}

#[tokio::test]
async fn refill_waits_for_the_window() {
    let harness = TestHarness::new();
    harness.open_account("pro").await;
    refresh(&harness).await;

    harness
        .server
        .post(&harness.account_path("/debit"))
        .add_header(TestHarness::api_key_name(), harness.api_key_value())
        .json(&json!({ "amount": 90, "description": "Generate" }))
        .await
        .assert_status_ok();

    harness.clock.advance(chrono::Duration::hours(23));
    let body = refresh(&harness).await;
    assert_eq!(body["credits"], 10);
    assert_eq!(body["refreshed"], false);

    harness.clock.advance(chrono::Duration::hours(2));
    let body = refresh(&harness).await;
    assert_eq!(body["credits"], 100);
    assert_eq!(body["refreshed"], true);
}

// ============================================================================
// Debit
// ============================================================================

#[tokio::test]
async fn debit_returns_remaining_balance() {
    let harness = TestHarness::new();
    harness.open_account("free").await;
    refresh(&harness).await;

    let response = harness
        .server
        .post(&harness.account_path("/debit"))
        .add_header(TestHarness::api_key_name(), harness.api_key_value())
        .json(&json!({ "amount": 3, "description": "Preview" }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["remaining"], 7);
}

#[tokio::test]
async fn over_debit_is_payment_required() {
    let harness = TestHarness::new();
    harness.open_account("free").await;
    refresh(&harness).await;

    let response = harness
        .server
        .post(&harness.account_path("/debit"))
        .add_header(TestHarness::api_key_name(), harness.api_key_value())
        .json(&json!({ "amount": 11, "description": "Deploy" }))
        .await;

    response.assert_status(StatusCode::PAYMENT_REQUIRED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "insufficient_credits");
    assert_eq!(body["error"]["details"]["balance"], 10);
    assert_eq!(body["error"]["details"]["required"], 11);

    let body = refresh(&harness).await;
    assert_eq!(body["credits"], 10);
}

#[tokio::test]
async fn non_positive_amounts_are_bad_requests() {
    let harness = TestHarness::new();
    harness.open_account("free").await;

    for path in ["/debit", "/credit"] {
        for amount in [0, -4] {
            let response = harness
                .server
                .post(&harness.account_path(path))
                .add_header(TestHarness::api_key_name(), harness.api_key_value())
                .json(&json!({ "amount": amount }))
                .await;
            response.assert_status(StatusCode::BAD_REQUEST);
        }
    }
}

#[tokio::test]
async fn debit_for_unknown_account_is_not_found() {
    let harness = TestHarness::new();

    harness
        .server
        .post(&harness.account_path("/debit"))
        .add_header(TestHarness::api_key_name(), harness.api_key_value())
        .json(&json!({ "amount": 1 }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

// ============================================================================
// Purchase and history
// ============================================================================

#[tokio::test]
async fn purchase_adds_to_balance() {
    let harness = TestHarness::new();
    harness.open_account("free").await;
    refresh(&harness).await;

    let response = harness
        .server
        .post(&harness.account_path("/credit"))
        .add_header(TestHarness::api_key_name(), harness.api_key_value())
        .json(&json!({ "amount": 250, "description": "Checkout cs_test_1" }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["credits"], 260);
}

#[tokio::test]
async fn history_lists_newest_first() {
    let harness = TestHarness::new();
    harness.open_account("free").await;
    refresh(&harness).await;
    harness.purchase(40).await;
    harness
        .server
        .post(&harness.account_path("/debit"))
        .add_header(TestHarness::api_key_name(), harness.api_key_value())
        .json(&json!({ "amount": 5, "description": "Preview" }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .get(&harness.account_path("/history"))
        .add_header(TestHarness::api_key_name(), harness.api_key_value())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["entry_type"], HistoryType::Debit.as_str());
    assert_eq!(entries[0]["amount"], -5);
    assert_eq!(entries[0]["balance_after"], 45);
    assert_eq!(entries[1]["entry_type"], HistoryType::Purchase.as_str());
    assert_eq!(entries[2]["entry_type"], HistoryType::DailyReset.as_str());
    assert_eq!(entries[2]["amount"], 10);
    assert_eq!(body["has_more"], false);
}

#[tokio::test]
async fn history_paginates() {
    let harness = TestHarness::new();
    harness.open_account("free").await;
    for _ in 0..3 {
        harness.purchase(1).await;
    }

    let response = harness
        .server
        .get(&format!("{}?limit=2&offset=0", harness.account_path("/history")))
        .add_header(TestHarness::api_key_name(), harness.api_key_value())
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["entries"].as_array().unwrap().len(), 2);
    assert_eq!(body["has_more"], true);

    let response = harness
        .server
        .get(&format!("{}?limit=2&offset=2", harness.account_path("/history")))
        .add_header(TestHarness::api_key_name(), harness.api_key_value())
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["entries"].as_array().unwrap().len(), 1);
    assert_eq!(body["has_more"], false);

    assert_eq!(harness.store.history_len(&harness.test_user_id), 3);
}
