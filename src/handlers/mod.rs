mod plans;
mod subscription;
mod transactions;
mod users;
pub mod webhook;

pub use plans::*;
pub use subscription::*;
pub use transactions::*;
pub use users::*;

use axum::{
    Json, Router,
    routing::{get, post},
};
use serde::Serialize;

use crate::config::RateLimitConfig;
use crate::db::AppState;
use crate::rate_limit;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router(rate_limit: RateLimitConfig) -> Router<AppState> {
    // Strict tier: both routes call out to Flutterwave.
    let strict = Router::new()
        .route("/subscription/verify", post(verify_subscription))
        .route("/subscription/cancel", post(cancel_subscription))
        .layer(rate_limit::strict_layer(rate_limit.strict_rpm));

    let standard = Router::new()
        .route("/plans", get(list_plans))
        .route("/plans/{plan_id}", get(get_plan))
        .route("/transactions", get(list_transactions))
        .route("/subscription", get(current_subscription))
        .route("/users/sync", post(sync_user))
        .layer(rate_limit::standard_layer(rate_limit.standard_rpm));

    let relaxed = Router::new()
        .route("/health", get(health))
        .layer(rate_limit::relaxed_layer(rate_limit.relaxed_rpm));

    strict.merge(standard).merge(relaxed)
}
