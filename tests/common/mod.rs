//! Test utilities and fixtures for Ravebill integration tests

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, header};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

pub use ravebill::config::{Config, RateLimitConfig};
pub use ravebill::db::{AppState, DbPool, init_db, queries};
pub use ravebill::flutterwave::FlutterwaveClient;
pub use ravebill::handlers;
pub use ravebill::models::*;

/// Shared secret the test state expects in the `verif-hash` header.
pub const TEST_WEBHOOK_HASH: &str = "test-verif-hash";

/// Config pointing at a mock provider server. The public key carries the
/// `TEST` marker, so states built from this run in sandbox mode.
pub fn test_config(api_url: &str) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_path: ":memory:".to_string(),
        frontend_origin: "http://localhost:3000".to_string(),
        flw_secret_key: "FLWSECK_TEST-secret-x".to_string(),
        flw_webhook_hash: TEST_WEBHOOK_HASH.to_string(),
        flw_public_key: "FLWPUBK_TEST-public-x".to_string(),
        flw_api_url: api_url.to_string(),
        flw_timeout_secs: 5,
        rate_limit: RateLimitConfig::default(),
        dev_mode: false,
    }
}

/// In-memory pool capped at one connection so every checkout sees the same
/// database.
pub fn test_pool() -> DbPool {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder().max_size(1).build(manager).unwrap();
    {
        let conn = pool.get().unwrap();
        init_db(&conn).unwrap();
    }
    pool
}

/// Create an AppState wired to a mock provider at `api_url`.
pub fn create_test_app_state(api_url: &str) -> AppState {
    let config = test_config(api_url);
    AppState {
        db: test_pool(),
        flutterwave: FlutterwaveClient::new(&config),
        webhook_hash: config.flw_webhook_hash.clone(),
        test_mode: config.is_test_mode(),
    }
}

/// Create a Router with all public endpoints (without rate limiting for tests)
pub fn public_app(state: AppState) -> Router {
    use axum::routing::{get, post};
    use ravebill::handlers::{
        cancel_subscription, current_subscription, get_plan, health, list_plans,
        list_transactions, sync_user, verify_subscription,
    };

    Router::new()
        .route("/health", get(health))
        .route("/plans", get(list_plans))
        .route("/plans/{plan_id}", get(get_plan))
        .route("/transactions", get(list_transactions))
        .route("/subscription", get(current_subscription))
        .route("/subscription/verify", post(verify_subscription))
        .route("/subscription/cancel", post(cancel_subscription))
        .route("/users/sync", post(sync_user))
        .with_state(state)
}

/// Create a Router with the webhook endpoint.
pub fn webhook_app(state: AppState) -> Router {
    handlers::webhook::router().with_state(state)
}

/// Mirror a user row directly through the store.
pub fn create_test_user(state: &AppState, id: &str, email: &str) -> User {
    let conn = state.db.get().unwrap();
    queries::upsert_user(
        &conn,
        &SyncUser {
            id: id.to_string(),
            email: email.to_string(),
            full_name: Some("Test User".to_string()),
        },
    )
    .expect("Failed to create test user")
}

/// Store an active subscription row directly, shaped like one produced by a
/// verified monthly charge.
pub fn create_test_subscription(
    state: &AppState,
    user_id: &str,
    transaction_id: &str,
    provider_subscription_id: Option<&str>,
) -> Subscription {
    let conn = state.db.get().unwrap();
    let start = chrono::Utc::now().timestamp();
    queries::upsert_subscription(
        &conn,
        &SubscriptionUpsert {
            user_id: user_id.to_string(),
            flutterwave_transaction_id: transaction_id.to_string(),
            flutterwave_plan_id: "101".to_string(),
            flutterwave_customer_id: Some("7".to_string()),
            flutterwave_subscription_id: provider_subscription_id.map(|s| s.to_string()),
            customer_email: Some("jane@mail.com".to_string()),
            status: SubscriptionStatus::Active,
            amount: 5000.0,
            currency: "NGN".to_string(),
            current_period_start: start,
            current_period_end: start + 30 * 86400,
        },
    )
    .expect("Failed to create test subscription")
}

pub fn get_subscription_for_user(state: &AppState, user_id: &str) -> Option<Subscription> {
    let conn = state.db.get().unwrap();
    queries::get_subscription_for_user(&conn, user_id).unwrap()
}

pub fn get_charge(state: &AppState, transaction_id: &str) -> Option<Charge> {
    let conn = state.db.get().unwrap();
    queries::get_charge_by_transaction(&conn, transaction_id).unwrap()
}

pub fn count_rows(state: &AppState, table: &str) -> i64 {
    let conn = state.db.get().unwrap();
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
        .unwrap()
}

/// Build a JSON request.
pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Build a webhook delivery with the given `verif-hash` value.
pub fn webhook_request(hash: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("verif-hash", hash)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Read a response body as JSON.
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).expect("Response should be valid JSON")
}
