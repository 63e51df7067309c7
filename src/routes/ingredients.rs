use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppResult,
    models::IngredientAnalysis,
    services::normalizer::{canonical_ingredients, require_ingredients},
};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub ingredients: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub ingredients: Vec<String>,
    pub analysis: IngredientAnalysis,
    pub enhanced: bool,
}

/// Handler for ingredient analysis
pub async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> AppResult<Json<AnalyzeResponse>> {
    let normalized = require_ingredients(&request.ingredients)?;

    // Free-form lines like "2 cups diced tomatoes" analyse better as "tomato"
    let mut ingredients = canonical_ingredients(&normalized);
    if ingredients.is_empty() {
        ingredients = normalized;
    }

    let analysis = state.gateway.analyze_ingredients(&ingredients).await;
    Ok(Json(AnalyzeResponse {
        ingredients,
        analysis: analysis.value,
        enhanced: analysis.enhanced,
    }))
}
