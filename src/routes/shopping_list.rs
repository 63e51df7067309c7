use axum::{extract::State, Json};
use serde::Deserialize;

use crate::{
    error::AppResult,
    models::{ExternalId, ShoppingList, ShoppingListOptions},
    services::shopping_list::ShoppingListSource,
};

use super::{extract::MaybeUserId, AppState};

#[derive(Debug, Deserialize)]
pub struct ShoppingListBody {
    #[serde(default)]
    pub recipe_ids: Option<Vec<ExternalId>>,
    #[serde(default)]
    pub from_meal_plan: bool,
    #[serde(flatten)]
    pub options: ShoppingListOptions,
}

/// Handler for building a consolidated shopping list
pub async fn build(
    State(state): State<AppState>,
    MaybeUserId(user_id): MaybeUserId,
    Json(body): Json<ShoppingListBody>,
) -> AppResult<Json<ShoppingList>> {
    // "716429" and 716429 name the same recipe
    let recipe_ids = body
        .recipe_ids
        .map(|ids| {
            ids.iter()
                .map(|id| id.to_string().parse::<ExternalId>())
                .collect::<AppResult<Vec<_>>>()
        })
        .transpose()?;

    let source = ShoppingListSource::from_request(recipe_ids, body.from_meal_plan)?;
    let list = state
        .shopping_lists
        .build(user_id, source, body.options)
        .await?;
    Ok(Json(list))
}
