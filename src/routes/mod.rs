use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{make_span_with_request_id, request_id_middleware};

pub mod extract;
pub mod ingredients;
pub mod meal_plans;
pub mod preferences;
pub mod recipes;
pub mod shopping_list;
pub mod state;

pub use state::{AppDependencies, AppState};

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                // Request id must exist before the trace span is created
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id)),
        )
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Recipes
        .route("/recipes/suggestions", post(recipes::suggestions))
        .route("/recipes/trending", get(recipes::trending))
        .route("/recipes/:id", get(recipes::details))
        .route("/recipes/:id/tips", get(recipes::tips))
        .route("/recipes/:id/rating", post(recipes::rate))
        .route("/recipes/:id/favorite", post(recipes::toggle_favorite))
        // Ingredients
        .route("/ingredients/analyze", post(ingredients::analyze))
        // Meal plans
        .route("/meal-plans", post(meal_plans::generate))
        .route("/meal-plans/current", get(meal_plans::current))
        // Preferences
        .route(
            "/preferences",
            get(preferences::get_preferences).put(preferences::update_preferences),
        )
        // Shopping list
        .route("/shopping-list", post(shopping_list::build))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
