use axum::extract::State;
use serde::Serialize;

use crate::db::{AppState, queries};
use crate::error::Result;
use crate::extractors::Json;
use crate::models::{SyncUser, User};

#[derive(Debug, Serialize)]
pub struct SyncUserResponse {
    pub success: bool,
    pub user: User,
}

/// POST /users/sync - mirror an auth-provider user locally so charges can
/// be matched to them by email when metadata is missing.
pub async fn sync_user(
    State(state): State<AppState>,
    Json(input): Json<SyncUser>,
) -> Result<Json<SyncUserResponse>> {
    input.validate()?;

    let conn = state.db.get()?;
    let user = queries::upsert_user(&conn, &input)?;
    Ok(Json(SyncUserResponse {
        success: true,
        user,
    }))
}
