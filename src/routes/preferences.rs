use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    models::{PreferencesUpdate, UserPreferences},
};

use super::{extract::UserId, AppState};

pub async fn get_preferences(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> AppResult<Json<UserPreferences>> {
    let prefs = state.preferences.get(user_id).await?;
    Ok(Json(prefs))
}

/// Handler for partial preference updates
pub async fn update_preferences(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(update): Json<PreferencesUpdate>,
) -> AppResult<Json<UserPreferences>> {
    let prefs = state.preferences.update(user_id, update).await?;
    Ok(Json(prefs))
}
