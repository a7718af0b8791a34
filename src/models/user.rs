use serde::{Deserialize, Serialize};

use crate::error::{msg, AppError, Result};

/// Basic email format validation.
///
/// Intentionally permissive to avoid rejecting valid but unusual emails.
/// Not meant to be RFC 5322 compliant - just a sanity check before we use
/// the address as a lookup key.
fn validate_email_format(email: &str) -> Result<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(AppError::BadRequest(msg::EMAIL_EMPTY.into()));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(AppError::BadRequest(msg::INVALID_EMAIL_FORMAT.into()));
    }

    let local_part = parts[0];
    let domain_part = parts[1];

    if local_part.is_empty() || local_part.contains(' ') {
        return Err(AppError::BadRequest(msg::INVALID_EMAIL_FORMAT.into()));
    }

    if domain_part.is_empty() || !domain_part.contains('.') {
        return Err(AppError::BadRequest(msg::INVALID_EMAIL_FORMAT.into()));
    }

    if domain_part.starts_with('.') || domain_part.ends_with('.') {
        return Err(AppError::BadRequest(msg::INVALID_EMAIL_FORMAT.into()));
    }

    Ok(())
}

/// Local mirror of an auth-provider user.
///
/// The auth service owns identity; this table exists so the webhook and
/// verification flows can resolve an internal user id from a customer email.
/// Emails are stored lowercased.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Payload for `POST /users/sync`, sent by the frontend after sign-in.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncUser {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
}

impl SyncUser {
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(AppError::BadRequest(msg::USER_ID_EMPTY.into()));
        }
        validate_email_format(&self.email)
    }
}
