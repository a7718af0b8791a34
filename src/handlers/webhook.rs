use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use chrono::Utc;
use serde_json::json;
use subtle::ConstantTimeEq;

use crate::db::{AppState, queries};
use crate::error::Result;
use crate::extractors::Json;
use crate::flutterwave::{WebhookPayload, json_id_string};
use crate::identity;
use crate::reconcile::{self, ChargeEvent};

pub fn router() -> Router<AppState> {
    Router::new().route("/webhook", post(handle_webhook))
}

/// Compare the `verif-hash` header against the configured secret without
/// leaking match position through timing. Fails closed when no secret is
/// configured.
fn signature_matches(expected: &str, provided: &[u8]) -> bool {
    if expected.is_empty() {
        return false;
    }
    let expected = expected.as_bytes();
    expected.len() == provided.len() && bool::from(expected.ct_eq(provided))
}

/// POST /webhook - Flutterwave event deliveries.
///
/// After authentication and parsing, every delivery is acked with 200:
/// the provider retries on non-2xx, and a replay of a failed delivery is
/// already handled by the charge ledger.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let provided = headers
        .get("verif-hash")
        .map(|v| v.as_bytes())
        .unwrap_or_default();
    if !signature_matches(&state.webhook_hash, provided) {
        tracing::warn!("webhook rejected: verif-hash mismatch");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Invalid signature"})),
        );
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!("webhook rejected: unparseable body: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "Invalid payload"})),
            );
        }
    };

    tracing::info!("webhook received: {}", payload.event);

    let outcome = match payload.event.as_str() {
        "charge.completed" => handle_charge_completed(&state, &payload),
        "subscription.cancelled" => handle_subscription_cancelled(&state, &payload),
        other => {
            tracing::warn!("unhandled webhook event: {}", other);
            Ok(())
        }
    };
    if let Err(e) = outcome {
        // Ack anyway; a provider retry would hit the same failure.
        tracing::error!("webhook processing failed for {}: {}", payload.event, e);
    }

    (StatusCode::OK, Json(json!({"status": "success"})))
}

/// A charge notification. Records the charge in the ledger exactly once and,
/// when the charge maps to a known user, reconciles their subscription row.
fn handle_charge_completed(state: &AppState, payload: &WebhookPayload) -> Result<()> {
    let Some(event) = ChargeEvent::from_webhook(&payload.data, payload.meta()) else {
        tracing::warn!("charge.completed without a transaction id, skipping");
        return Ok(());
    };

    let mut conn = state.db.get()?;
    let user_id = identity::resolve_user_id(
        &conn,
        event.meta_user_id.as_deref(),
        event.customer_email.as_deref(),
        state.test_mode,
    )?;

    let tx = conn.transaction()?;
    let charge = reconcile::build_charge(&event, user_id.as_deref(), None);
    if !queries::try_record_charge(&tx, &charge)? {
        tracing::info!("charge {} already processed, skipping", event.transaction_id);
        return Ok(());
    }

    let Some(user_id) = user_id else {
        tracing::warn!(
            "no resolvable user for webhook charge {} (customer email {:?})",
            event.transaction_id,
            event.customer_email
        );
        tx.commit()?;
        return Ok(());
    };

    let upsert = reconcile::build_upsert(&event, &user_id, None, None, Utc::now());
    let subscription = queries::upsert_subscription(&tx, &upsert)?;
    tx.commit()?;

    tracing::info!(
        "subscription {} reconciled from webhook (user {}, status {})",
        subscription.id,
        subscription.user_id,
        subscription.status
    );
    Ok(())
}

/// The provider stopped a recurring subscription on its side. The local row
/// is keyed by the originating transaction id in this payload.
fn handle_subscription_cancelled(state: &AppState, payload: &WebhookPayload) -> Result<()> {
    let Some(transaction_id) = payload.data.get("id").and_then(json_id_string) else {
        tracing::warn!("subscription.cancelled without an id, skipping");
        return Ok(());
    };

    let conn = state.db.get()?;
    if queries::cancel_subscription_by_transaction(&conn, &transaction_id)? {
        tracing::info!(
            "subscription cancelled via webhook (transaction {})",
            transaction_id
        );
    } else {
        tracing::warn!(
            "subscription.cancelled for unknown transaction {}",
            transaction_id
        );
    }
    Ok(())
}
