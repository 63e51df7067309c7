use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    config::MatchStrictness,
    db::store::{matches_ingredients, RecipeStore},
    error::{AppError, AppResult},
    models::{ExternalId, MealPlan, PreferencesUpdate, Rating, Recipe, UserPreferences},
    services::ratings,
};

/// Process-local store, used when no database is configured and in tests
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<InMemoryStoreInner>>,
}

#[derive(Default)]
struct InMemoryStoreInner {
    recipes: HashMap<ExternalId, Recipe>,
    preferences: HashMap<Uuid, UserPreferences>,
    favorites: HashSet<(Uuid, ExternalId)>,
    meal_plans: HashMap<Uuid, MealPlan>,
}

impl InMemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored recipe documents
    pub async fn recipe_count(&self) -> usize {
        self.inner.read().await.recipes.len()
    }
}

fn not_found(id: &ExternalId) -> AppError {
    AppError::NotFound(format!("Recipe {} not found", id))
}

#[async_trait::async_trait]
impl RecipeStore for InMemoryStore {
    async fn find_by_external_id(&self, id: &ExternalId) -> AppResult<Option<Recipe>> {
        Ok(self.inner.read().await.recipes.get(id).cloned())
    }

    async fn find_many(&self, ids: &[ExternalId]) -> AppResult<Vec<Recipe>> {
        let inner = self.inner.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.recipes.get(id).cloned())
            .collect())
    }

    async fn find_by_ingredients(
        &self,
        ingredients: &[String],
        strictness: MatchStrictness,
        limit: usize,
    ) -> AppResult<Vec<Recipe>> {
        let inner = self.inner.read().await;
        let mut matches: Vec<Recipe> = inner
            .recipes
            .values()
            .filter(|r| matches_ingredients(r, ingredients, strictness))
            .cloned()
            .collect();

        // Same order the database returns: most popular first, then by id
        matches.sort_by(|a, b| {
            b.popularity
                .total_cmp(&a.popularity)
                .then_with(|| a.external_id.cmp(&b.external_id))
        });
        matches.truncate(limit);
        Ok(matches)
    }

    async fn upsert_recipe(&self, recipe: Recipe) -> AppResult<Recipe> {
        let mut inner = self.inner.write().await;
        let stored = match inner.recipes.get_mut(&recipe.external_id) {
            Some(existing) => {
                existing.refresh_from(recipe);
                existing.clone()
            }
            None => {
                inner
                    .recipes
                    .insert(recipe.external_id.clone(), recipe.clone());
                recipe
            }
        };
        Ok(stored)
    }

    async fn record_rating(&self, id: &ExternalId, rating: Rating) -> AppResult<Recipe> {
        let mut inner = self.inner.write().await;
        let recipe = inner.recipes.get_mut(id).ok_or_else(|| not_found(id))?;
        ratings::apply_rating(recipe, rating, Utc::now());
        Ok(recipe.clone())
    }

    async fn toggle_favorite(&self, user_id: Uuid, id: &ExternalId) -> AppResult<bool> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        let recipe = inner.recipes.get_mut(id).ok_or_else(|| not_found(id))?;

        let key = (user_id, id.clone());
        let favorite = if inner.favorites.remove(&key) {
            recipe.favorite_count = recipe.favorite_count.saturating_sub(1);
            false
        } else {
            inner.favorites.insert(key);
            recipe.favorite_count += 1;
            true
        };

        let prefs = inner.preferences.entry(user_id).or_default();
        if prefs.favorite_recipes.contains(id) != favorite {
            prefs.toggle_favorite(id);
        }

        Ok(favorite)
    }

    async fn rated_recipes(&self, limit: usize) -> AppResult<Vec<Recipe>> {
        let inner = self.inner.read().await;
        let mut rated: Vec<Recipe> = inner
            .recipes
            .values()
            .filter(|r| r.rating_count > 0)
            .cloned()
            .collect();
        rated.sort_by(|a, b| {
            b.rating_count
                .cmp(&a.rating_count)
                .then_with(|| a.external_id.cmp(&b.external_id))
        });
        rated.truncate(limit);
        Ok(rated)
    }

    async fn get_preferences(&self, user_id: Uuid) -> AppResult<UserPreferences> {
        Ok(self
            .inner
            .read()
            .await
            .preferences
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_preferences(
        &self,
        user_id: Uuid,
        update: PreferencesUpdate,
    ) -> AppResult<UserPreferences> {
        let mut inner = self.inner.write().await;
        let prefs = inner.preferences.entry(user_id).or_default();
        prefs.apply(update);
        Ok(prefs.clone())
    }

    async fn record_search(
        &self,
        user_id: Uuid,
        ingredients: Vec<String>,
        limit: usize,
    ) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner
            .preferences
            .entry(user_id)
            .or_default()
            .record_search(ingredients, limit);
        Ok(())
    }

    async fn save_meal_plan(&self, plan: &MealPlan) -> AppResult<()> {
        self.inner
            .write()
            .await
            .meal_plans
            .insert(plan.user_id, plan.clone());
        Ok(())
    }

    async fn active_meal_plan(&self, user_id: Uuid) -> AppResult<Option<MealPlan>> {
        Ok(self.inner.read().await.meal_plans.get(&user_id).cloned())
    }
}
