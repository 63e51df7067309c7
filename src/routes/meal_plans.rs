use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use crate::{error::AppResult, models::MealPlan};

use super::{extract::UserId, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct MealPlanRequest {
    /// Defaults to the user's recent searches
    #[serde(default)]
    pub ingredients: Option<Vec<String>>,
}

/// Handler for generating the user's weekly plan
pub async fn generate(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    request: Option<Json<MealPlanRequest>>,
) -> AppResult<(StatusCode, Json<MealPlan>)> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let plan = state
        .meal_plans
        .generate_for_user(user_id, request.ingredients)
        .await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

pub async fn current(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> AppResult<Json<MealPlan>> {
    let plan = state.meal_plans.current_plan(user_id).await?;
    Ok(Json(plan))
}
