use axum::extract::State;
use serde::Serialize;

use crate::db::AppState;
use crate::error::{AppError, Result, msg};
use crate::extractors::{Json, Path};
use crate::flutterwave::Plan;

#[derive(Debug, Serialize)]
pub struct PlansResponse {
    pub success: bool,
    pub plans: Vec<Plan>,
}

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub success: bool,
    pub plan: Plan,
}

/// GET /plans - billing plans straight from the provider, active only.
pub async fn list_plans(State(state): State<AppState>) -> Result<Json<PlansResponse>> {
    let plans = state.flutterwave.list_plans().await.map_err(|e| match e {
        AppError::Upstream { message, .. } => {
            tracing::error!("plan listing failed: {}", message);
            AppError::upstream(msg::PLANS_FETCH_FAILED)
        }
        other => other,
    })?;

    let plans = plans.into_iter().filter(|p| p.status == "active").collect();
    Ok(Json(PlansResponse {
        success: true,
        plans,
    }))
}

/// GET /plans/{plan_id}
pub async fn get_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<String>,
) -> Result<Json<PlanResponse>> {
    let plan = state
        .flutterwave
        .get_plan(&plan_id)
        .await
        .map_err(|e| match e {
            AppError::Upstream { .. } => AppError::NotFound(msg::PLAN_NOT_FOUND.into()),
            other => other,
        })?;
    Ok(Json(PlanResponse {
        success: true,
        plan,
    }))
}
