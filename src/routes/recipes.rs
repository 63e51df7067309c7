use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppResult,
    models::{ExternalId, Recipe, SearchFilters},
    services::suggestions::Suggestions,
};

use super::{
    extract::{MaybeUserId, UserId},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct SuggestionRequest {
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(flatten)]
    pub filters: SearchFilters,
}

#[derive(Debug, Deserialize)]
pub struct TrendingQuery {
    #[serde(default = "default_trending_limit")]
    pub limit: usize,
}

fn default_trending_limit() -> usize {
    10
}

#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub rating: f64,
}

#[derive(Debug, Serialize)]
pub struct RatingResponse {
    pub recipe_id: ExternalId,
    pub average_rating: f64,
    pub rating_count: u32,
}

#[derive(Debug, Serialize)]
pub struct FavoriteResponse {
    pub recipe_id: ExternalId,
    pub favorite: bool,
}

#[derive(Debug, Serialize)]
pub struct TipsResponse {
    pub recipe_id: ExternalId,
    pub tips: Vec<String>,
    pub enhanced: bool,
}

/// Handler for ingredient-based suggestions
pub async fn suggestions(
    State(state): State<AppState>,
    MaybeUserId(user_id): MaybeUserId,
    Json(request): Json<SuggestionRequest>,
) -> AppResult<Json<Suggestions>> {
    let suggestions = state
        .suggestions
        .suggest(user_id, &request.ingredients, &request.filters, request.count)
        .await?;
    Ok(Json(suggestions))
}

pub async fn trending(
    State(state): State<AppState>,
    Query(params): Query<TrendingQuery>,
) -> AppResult<Json<Vec<Recipe>>> {
    let recipes = state.ratings.trending(params.limit).await?;
    Ok(Json(recipes))
}

/// Handler for recipe details
pub async fn details(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Recipe>> {
    let id: ExternalId = id.parse()?;
    let recipe = state.recipes.resolve_details(&id).await?;
    Ok(Json(recipe))
}

pub async fn tips(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<TipsResponse>> {
    let id: ExternalId = id.parse()?;
    let recipe = state.recipes.resolve_details(&id).await?;
    let tips = state.gateway.cooking_tips(&recipe).await;
    Ok(Json(TipsResponse {
        recipe_id: id,
        tips: tips.value,
        enhanced: tips.enhanced,
    }))
}

pub async fn rate(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<String>,
    Json(request): Json<RatingRequest>,
) -> AppResult<Json<RatingResponse>> {
    let id: ExternalId = id.parse()?;
    let recipe = state.ratings.rate(&id, user_id, request.rating).await?;
    Ok(Json(RatingResponse {
        recipe_id: recipe.external_id,
        average_rating: recipe.average_rating,
        rating_count: recipe.rating_count,
    }))
}

pub async fn toggle_favorite(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<String>,
) -> AppResult<Json<FavoriteResponse>> {
    let id: ExternalId = id.parse()?;
    let favorite = state.ratings.toggle_favorite(&id, user_id).await?;
    Ok(Json(FavoriteResponse {
        recipe_id: id,
        favorite,
    }))
}
