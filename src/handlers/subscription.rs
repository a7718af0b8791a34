use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::error::{AppError, OptionExt, Result, msg};
use crate::extractors::{Json, Query};
use crate::flutterwave::{CancelDisposition, find_subscription_for_plan};
use crate::identity;
use crate::models::Subscription;
use crate::reconcile::{self, ChargeEvent};

/// Ids arrive as JSON numbers from the payment widget and as strings from
/// newer clients; accept both.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IdField {
    Number(i64),
    Text(String),
}

impl IdField {
    pub fn as_string(&self) -> String {
        match self {
            IdField::Number(n) => n.to_string(),
            IdField::Text(s) => s.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub transaction_id: IdField,
    pub plan_id: IdField,
    /// Sent by the checkout widget; not needed server-side.
    pub plan_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<Subscription>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionQuery {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub success: bool,
    /// Null when the user has never subscribed.
    pub subscription: Option<Subscription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub subscription_id: Option<String>,
    pub flutterwave_transaction_id: Option<IdField>,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub success: bool,
    pub message: String,
}

/// POST /subscription/verify - client-reported charge completion.
///
/// Confirms the charge with the provider, then reconciles the caller's
/// subscription row. When the charge carries no resolvable user the row is
/// left to the webhook path, which sees every charge eventually.
pub async fn verify_subscription(
    State(state): State<AppState>,
    Json(input): Json<VerifyRequest>,
) -> Result<(StatusCode, Json<VerifyResponse>)> {
    let transaction_id = input.transaction_id.as_string();
    let requested_plan = input.plan_id.as_string();

    let verification = match state.flutterwave.verify_transaction(&transaction_id).await {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("verification call failed for {}: {}", transaction_id, e);
            return Err(AppError::upstream(msg::VERIFICATION_FAILED));
        }
    };

    if !verification.verified {
        tracing::warn!(
            "payment verification failed for {}: provider status {}",
            transaction_id,
            verification.raw_status
        );
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(VerifyResponse {
                success: false,
                subscription: None,
                message: Some(msg::VERIFY_FAILED.into()),
                warning: None,
            }),
        ));
    }
    let transaction = verification
        .transaction
        .ok_or_else(|| AppError::upstream(msg::VERIFICATION_FAILED))?;

    let event = ChargeEvent::from_verification(&transaction);
    let mut conn = state.db.get()?;

    let user_id = identity::resolve_user_id(
        &conn,
        event.meta_user_id.as_deref(),
        event.customer_email.as_deref(),
        state.test_mode,
    )?;
    let Some(user_id) = user_id else {
        // Nothing to key the row on yet. The webhook delivery for this
        // charge may carry metadata we did not get here.
        tracing::warn!("no resolvable user for verified charge {}", transaction_id);
        return Ok((
            StatusCode::OK,
            Json(VerifyResponse {
                success: true,
                subscription: None,
                message: Some(msg::VERIFY_DEFERRED.into()),
                warning: None,
            }),
        ));
    };

    // Best-effort: locate the provider's recurring-subscription object so
    // the cancel flow can stop billing later. Failure degrades the row, it
    // never aborts verification.
    let plan_for_match = event.resolved_plan_id(Some(&requested_plan));
    let provider_sub_id = match event.customer_email.as_deref() {
        Some(email) => match state.flutterwave.list_subscriptions(email).await {
            Ok(subs) => {
                find_subscription_for_plan(&subs, &plan_for_match).map(|s| s.id.to_string())
            }
            Err(e) => {
                tracing::warn!("provider subscription lookup failed for {}: {}", email, e);
                None
            }
        },
        None => None,
    };
    let warning = provider_sub_id
        .is_none()
        .then(|| msg::PROVIDER_SUBSCRIPTION_UNRESOLVED.to_string());

    let charge = reconcile::build_charge(&event, Some(&user_id), Some(&requested_plan));
    let upsert = reconcile::build_upsert(
        &event,
        &user_id,
        Some(&requested_plan),
        provider_sub_id,
        Utc::now(),
    );

    let tx = conn.transaction()?;
    let stored = queries::try_record_charge(&tx, &charge)
        .and_then(|_| queries::upsert_subscription(&tx, &upsert));
    let subscription = match stored {
        Ok(sub) => {
            tx.commit()?;
            sub
        }
        Err(e) => {
            tracing::error!(
                "failed to store subscription for charge {}: {}",
                transaction_id,
                e
            );
            return Err(AppError::upstream(msg::SUBSCRIPTION_CREATE_FAILED));
        }
    };

    tracing::info!(
        "subscription {} reconciled from verification (user {}, plan {})",
        subscription.id,
        subscription.user_id,
        subscription.flutterwave_plan_id
    );

    Ok((
        StatusCode::OK,
        Json(VerifyResponse {
            success: true,
            subscription: Some(subscription),
            message: None,
            warning,
        }),
    ))
}

/// GET /subscription?userId= - the user's current subscription row.
pub async fn current_subscription(
    State(state): State<AppState>,
    Query(query): Query<SubscriptionQuery>,
) -> Result<Json<SubscriptionResponse>> {
    let conn = state.db.get()?;
    let subscription = queries::get_subscription_for_user(&conn, &query.user_id)?;
    Ok(Json(SubscriptionResponse {
        success: true,
        subscription,
    }))
}

/// POST /subscription/cancel
///
/// Provider first, then the local row: recurring billing must be confirmed
/// stopped before the record claims cancelled. A subscription the provider
/// already considers cancelled or gone counts as stopped.
pub async fn cancel_subscription(
    State(state): State<AppState>,
    Json(input): Json<CancelRequest>,
) -> Result<Json<CancelResponse>> {
    let conn = state.db.get()?;

    let subscription = match (&input.subscription_id, &input.flutterwave_transaction_id) {
        (Some(id), _) => queries::get_subscription_by_id(&conn, id)?,
        (None, Some(tx)) => queries::get_subscription_by_transaction(&conn, &tx.as_string())?,
        (None, None) => return Err(AppError::BadRequest(msg::SUBSCRIPTION_REF_REQUIRED.into())),
    }
    .or_not_found(msg::SUBSCRIPTION_NOT_FOUND)?;

    let provider_sub_id = subscription.flutterwave_subscription_id.clone().ok_or_else(|| {
        AppError::bad_request_with_details(
            msg::MISSING_PROVIDER_SUBSCRIPTION,
            msg::MISSING_PROVIDER_SUBSCRIPTION_HINT,
        )
    })?;

    match state.flutterwave.cancel_subscription(&provider_sub_id).await {
        Ok(CancelDisposition::Cancelled) => {}
        Ok(CancelDisposition::AlreadyCancelled) => {
            tracing::warn!(
                "subscription {} was already cancelled at the provider",
                subscription.id
            );
        }
        Err(AppError::Upstream { message, .. }) => {
            return Err(AppError::upstream_with_details(
                msg::CANCEL_PROVIDER_FAILED,
                message,
            ));
        }
        Err(e) => {
            tracing::error!("provider cancellation call failed: {}", e);
            return Err(AppError::upstream(msg::CANCEL_NETWORK_FAILED));
        }
    }

    let cancelled = queries::mark_subscription_cancelled(&conn, &subscription.id)?
        .or_not_found(msg::SUBSCRIPTION_NOT_FOUND)?;
    tracing::info!(
        "subscription {} cancelled for user {}",
        cancelled.id,
        cancelled.user_id
    );

    Ok(Json(CancelResponse {
        success: true,
        message: msg::CANCEL_SUCCESS.into(),
    }))
}
