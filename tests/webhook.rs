//! Tests for the POST /webhook endpoint: signature checks, charge
//! reconciliation, replay handling, and provider-driven cancellation.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::*;

fn charge_completed(transaction_id: i64, status: &str) -> serde_json::Value {
    json!({
        "event": "charge.completed",
        "data": {
            "id": transaction_id,
            "tx_ref": "rave-12345",
            "amount": 5000.0,
            "currency": "NGN",
            "status": status,
            "plan": 101,
            "customer": {"id": 7, "email": "ravesb_test_jane@mail.com"}
        }
    })
}

// ============ Signature Tests ============

#[tokio::test]
async fn test_webhook_rejects_wrong_signature() {
    let state = create_test_app_state("http://unused.invalid");
    let app = webhook_app(state.clone());

    let response = app
        .oneshot(webhook_request("wrong-hash", charge_completed(1, "successful")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Invalid signature");

    assert_eq!(count_rows(&state, "charges"), 0, "rejected delivery should write nothing");
    assert_eq!(count_rows(&state, "subscriptions"), 0);
}

#[tokio::test]
async fn test_webhook_rejects_missing_signature() {
    let state = create_test_app_state("http://unused.invalid");
    let app = webhook_app(state);

    let request = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json")
        .body(Body::from(charge_completed(1, "successful").to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_webhook_rejects_unparseable_body() {
    let state = create_test_app_state("http://unused.invalid");
    let app = webhook_app(state);

    let request = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("verif-hash", TEST_WEBHOOK_HASH)
        .header("content-type", "application/json")
        .body(Body::from("not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Invalid payload");
}

// ============ charge.completed Tests ============

#[tokio::test]
async fn test_charge_completed_with_meta_user_creates_subscription() {
    let state = create_test_app_state("http://unused.invalid");
    let app = webhook_app(state.clone());

    let mut payload = charge_completed(999871, "successful");
    payload["meta_data"] = json!({"userId": "u-42"});

    let response = app
        .oneshot(webhook_request(TEST_WEBHOOK_HASH, payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "success");

    let sub = get_subscription_for_user(&state, "u-42").expect("subscription should exist");
    assert_eq!(sub.flutterwave_transaction_id, "999871");
    assert_eq!(sub.flutterwave_plan_id, "101");
    assert_eq!(sub.status, SubscriptionStatus::Active);
    assert_eq!(sub.amount, 5000.0);
    assert_eq!(sub.customer_email.as_deref(), Some("ravesb_test_jane@mail.com"));

    let charge = get_charge(&state, "999871").expect("charge should be recorded");
    assert_eq!(charge.source, ChargeSource::Webhook);
    assert_eq!(charge.user_id.as_deref(), Some("u-42"));
}

#[tokio::test]
async fn test_charge_completed_resolves_user_via_sandbox_email() {
    let state = create_test_app_state("http://unused.invalid");
    create_test_user(&state, "u-7", "jane@mail.com");
    let app = webhook_app(state.clone());

    // No user id in the metadata; the sandbox-mangled customer email is the
    // only evidence.
    let response = app
        .oneshot(webhook_request(TEST_WEBHOOK_HASH, charge_completed(42, "successful")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let sub = get_subscription_for_user(&state, "u-7").expect("subscription should exist");
    assert_eq!(sub.flutterwave_transaction_id, "42");
}

#[tokio::test]
async fn test_charge_completed_replay_is_ignored() {
    let state = create_test_app_state("http://unused.invalid");
    let app = webhook_app(state.clone());

    let mut payload = charge_completed(999871, "successful");
    payload["meta_data"] = json!({"userId": "u-42"});

    let response = app
        .clone()
        .oneshot(webhook_request(TEST_WEBHOOK_HASH, payload.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Redelivery with a tampered amount. The ledger already has this
    // transaction, so nothing may change.
    payload["data"]["amount"] = json!(9999.0);
    let response = app
        .oneshot(webhook_request(TEST_WEBHOOK_HASH, payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(count_rows(&state, "charges"), 1);
    let sub = get_subscription_for_user(&state, "u-42").expect("subscription should exist");
    assert_eq!(sub.amount, 5000.0, "replay should not alter the row");
}

#[tokio::test]
async fn test_charge_completed_without_user_records_charge_only() {
    let state = create_test_app_state("http://unused.invalid");
    let app = webhook_app(state.clone());

    // No metadata user id and no user row matching the email.
    let response = app
        .oneshot(webhook_request(TEST_WEBHOOK_HASH, charge_completed(55, "successful")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "success", "unmatched charge is still acked");

    let charge = get_charge(&state, "55").expect("charge should be kept for later attribution");
    assert!(charge.user_id.is_none());
    assert_eq!(count_rows(&state, "subscriptions"), 0);
}

#[tokio::test]
async fn test_failed_charge_marks_subscription_failed() {
    let state = create_test_app_state("http://unused.invalid");
    let app = webhook_app(state.clone());

    let mut payload = charge_completed(77, "failed");
    payload["meta_data"] = json!({"userId": "u-42"});

    let response = app
        .oneshot(webhook_request(TEST_WEBHOOK_HASH, payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let sub = get_subscription_for_user(&state, "u-42").expect("subscription should exist");
    assert_eq!(sub.status, SubscriptionStatus::Failed);

    let charge = get_charge(&state, "77").expect("charge should be recorded");
    assert_eq!(charge.status, "failed");
}

// ============ subscription.cancelled Tests ============

#[tokio::test]
async fn test_subscription_cancelled_marks_local_row() {
    let state = create_test_app_state("http://unused.invalid");
    create_test_user(&state, "u-7", "jane@mail.com");
    create_test_subscription(&state, "u-7", "999871", Some("4092"));
    let app = webhook_app(state.clone());

    let payload = json!({
        "event": "subscription.cancelled",
        "data": {"id": 999871, "status": "cancelled"}
    });
    let response = app
        .oneshot(webhook_request(TEST_WEBHOOK_HASH, payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let sub = get_subscription_for_user(&state, "u-7").expect("subscription should exist");
    assert_eq!(sub.status, SubscriptionStatus::Cancelled);
    assert!(sub.cancelled_at.is_some());
}

#[tokio::test]
async fn test_subscription_cancelled_for_unknown_transaction_is_acked() {
    let state = create_test_app_state("http://unused.invalid");
    let app = webhook_app(state.clone());

    let payload = json!({
        "event": "subscription.cancelled",
        "data": {"id": 31337}
    });
    let response = app
        .oneshot(webhook_request(TEST_WEBHOOK_HASH, payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(count_rows(&state, "subscriptions"), 0);
}

// ============ Dispatch Tests ============

#[tokio::test]
async fn test_unknown_event_is_acked_and_ignored() {
    let state = create_test_app_state("http://unused.invalid");
    let app = webhook_app(state.clone());

    let payload = json!({
        "event": "transfer.completed",
        "data": {"id": 1}
    });
    let response = app
        .oneshot(webhook_request(TEST_WEBHOOK_HASH, payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "success");
    assert_eq!(count_rows(&state, "charges"), 0);
    assert_eq!(count_rows(&state, "subscriptions"), 0);
}
