use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::RecipeStore,
    error::AppResult,
    models::{InteractionEvent, InteractionKind, RecipeSummary, ResultSource, SearchFilters},
    services::{
        background::BackgroundTasks, enhancement::EnhancementGateway,
        normalizer::require_ingredients, recipe_cache::RecipeCacheStore,
    },
};

#[derive(Debug, Clone, Serialize)]
pub struct Suggestions {
    pub recipes: Vec<RecipeSummary>,
    pub enhanced: bool,
    pub source: ResultSource,
    pub count: usize,
}

/// Ingredient-based recipe suggestions
#[derive(Clone)]
pub struct SuggestionService {
    store: Arc<dyn RecipeStore>,
    recipes: RecipeCacheStore,
    gateway: EnhancementGateway,
    tasks: BackgroundTasks,
    history_limit: usize,
}

impl SuggestionService {
    pub fn new(
        store: Arc<dyn RecipeStore>,
        recipes: RecipeCacheStore,
        gateway: EnhancementGateway,
        tasks: BackgroundTasks,
        history_limit: usize,
    ) -> Self {
        Self {
            store,
            recipes,
            gateway,
            tasks,
            history_limit,
        }
    }

    pub async fn suggest(
        &self,
        user_id: Option<Uuid>,
        raw_ingredients: &[String],
        filters: &SearchFilters,
        count: Option<u32>,
    ) -> AppResult<Suggestions> {
        let ingredients = require_ingredients(raw_ingredients)?;

        let preferences = match user_id {
            Some(user_id) => {
                self.record_search(user_id, ingredients.clone());
                Some(self.store.get_preferences(user_id).await?)
            }
            None => None,
        };

        let resolved = self
            .recipes
            .resolve_by_ingredients(&ingredients, filters, count, preferences.as_ref())
            .await?;

        let ranked = self
            .gateway
            .enhance(resolved.recipes, preferences.as_ref(), &ingredients)
            .await;

        tracing::info!(
            ingredients = ?ingredients,
            count = ranked.value.len(),
            source = ?resolved.source,
            enhanced = ranked.enhanced,
            "Suggestions served"
        );

        self.gateway.train_from_interaction(
            InteractionEvent::new(user_id, InteractionKind::Search).with_ingredients(ingredients),
        );

        Ok(Suggestions {
            count: ranked.value.len(),
            recipes: ranked.value,
            enhanced: ranked.enhanced,
            source: resolved.source,
        })
    }

    fn record_search(&self, user_id: Uuid, ingredients: Vec<String>) {
        let store = self.store.clone();
        let limit = self.history_limit;
        self.tasks.spawn("suggestions.record_search", async move {
            if let Err(e) = store.record_search(user_id, ingredients, limit).await {
                tracing::warn!(error = %e, user_id = %user_id, "Failed to record search history");
            }
        });
    }
}
