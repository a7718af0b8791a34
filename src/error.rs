use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Client error that deserves an extra explanation in the body.
    #[error("Bad request: {message}")]
    BadRequestWithDetails { message: String, details: String },

    #[error("Unauthorized")]
    Unauthorized,

    /// Provider-reported failure on an outbound call. `message` is what the
    /// caller sees; `details` carries the provider's own message when we want
    /// to pass it through.
    #[error("Upstream error: {message}")]
    Upstream {
        message: String,
        details: Option<String>,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn bad_request_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        AppError::BadRequestWithDetails {
            message: message.into(),
            details: details.into(),
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        AppError::Upstream {
            message: message.into(),
            details: None,
        }
    }

    pub fn upstream_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        AppError::Upstream {
            message: message.into(),
            details: Some(details.into()),
        }
    }
}

/// Response messages shared between handlers and tests.
pub mod msg {
    pub const EMAIL_EMPTY: &str = "Email cannot be empty";
    pub const INVALID_EMAIL_FORMAT: &str = "Invalid email format";
    pub const USER_ID_EMPTY: &str = "User id cannot be empty";
    pub const SUBSCRIPTION_NOT_FOUND: &str = "Subscription not found";
    pub const PLAN_NOT_FOUND: &str = "Plan not found";
    pub const EMAIL_REQUIRED: &str = "Email required";
    pub const PLANS_FETCH_FAILED: &str = "Failed to fetch plans";
    pub const VERIFICATION_FAILED: &str = "Verification failed";
    pub const SUBSCRIPTION_CREATE_FAILED: &str = "Failed to create subscription";
    pub const MISSING_PROVIDER_SUBSCRIPTION: &str = "Flutterwave subscription ID not found";
    pub const MISSING_PROVIDER_SUBSCRIPTION_HINT: &str =
        "This subscription may have been created before the provider id lookup existed. Please contact support.";
    pub const CANCEL_PROVIDER_FAILED: &str = "Failed to cancel with Flutterwave";
    pub const CANCEL_NETWORK_FAILED: &str = "Failed to communicate with Flutterwave";
    pub const CANCEL_SUCCESS: &str =
        "Subscription cancelled successfully. You will not be charged again.";
    pub const SUBSCRIPTION_REF_REQUIRED: &str = "Subscription id required";
    pub const VERIFY_DEFERRED: &str =
        "Payment verified. Subscription will be activated via webhook.";
    pub const VERIFY_FAILED: &str = "Payment verification failed";
    pub const PROVIDER_SUBSCRIPTION_UNRESOLVED: &str =
        "Provider subscription id could not be confirmed; cancellation may require support.";
}

/// Convenience conversions for `Option` lookups in handlers.
pub trait OptionExt<T> {
    fn or_not_found(self, message: &str) -> Result<T>;
    fn or_bad_request(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_not_found(self, message: &str) -> Result<T> {
        self.ok_or_else(|| AppError::NotFound(message.to_string()))
    }

    fn or_bad_request(self, message: &str) -> Result<T> {
        self.ok_or_else(|| AppError::BadRequest(message.to_string()))
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            AppError::BadRequestWithDetails { message, details } => (
                StatusCode::BAD_REQUEST,
                message.clone(),
                Some(details.clone()),
            ),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string(), None),
            AppError::Upstream { message, details } => {
                tracing::error!("Upstream error: {} ({:?})", message, details);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    message.clone(),
                    details.clone(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
            AppError::Json(e) => {
                tracing::error!("JSON error: {}", e);
                (
                    StatusCode::BAD_REQUEST,
                    "Invalid JSON".to_string(),
                    Some(e.to_string()),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            success: false,
            error,
            details,
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
