use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::db::AppState;
use crate::error::{AppError, OptionExt, Result, msg};
use crate::extractors::{Json, Query};
use crate::flutterwave::FlwTransaction;

#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    pub success: bool,
    pub transactions: Vec<FlwTransaction>,
}

/// GET /transactions?email= - billing history for a customer email.
///
/// Provider-reported errors soft-fail to an empty list; history is
/// best-effort and the UI treats it that way.
pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<TransactionsResponse>> {
    let email = query
        .email
        .filter(|e| !e.trim().is_empty())
        .or_bad_request(msg::EMAIL_REQUIRED)?;

    let transactions = match state.flutterwave.list_transactions(&email).await {
        Ok(txs) => txs,
        Err(AppError::Upstream { message, .. }) => {
            tracing::warn!("transaction lookup failed for {}: {}", email, message);
            Vec::new()
        }
        Err(e) => return Err(e),
    };

    Ok(Json(TransactionsResponse {
        success: true,
        transactions,
    }))
}
