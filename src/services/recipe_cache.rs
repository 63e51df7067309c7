use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::{
    config::{Config, MatchStrictness},
    db::{Cache, CacheKey, RecipeStore},
    error::{AppError, AppResult},
    models::{
        ExternalId, IngredientQuery, Recipe, RecipeSummary, ResultSource, SearchFilters,
        UserPreferences,
    },
    services::{
        background::BackgroundTasks, normalizer::search_fingerprint, providers::RecipeProvider,
    },
};

pub const DEFAULT_COUNT: u32 = 10;
pub const MAX_COUNT: u32 = 100;
/// A local match needs at least `min(count, this)` recipes to count as a hit
const APPROXIMATE_HIT_FLOOR: usize = 10;

/// Tuning for the cache-aside flow
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub strictness: MatchStrictness,
    pub search_ttl_secs: u64,
    pub batch_size: usize,
    pub batch_pause: Duration,
}

impl CacheSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            strictness: config.cache_match_strictness,
            search_ttl_secs: config.search_cache_ttl_secs,
            batch_size: config.detail_batch_size.max(1),
            batch_pause: config.batch_pause(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            strictness: MatchStrictness::Any,
            search_ttl_secs: 3600,
            batch_size: 5,
            batch_pause: Duration::from_millis(250),
        }
    }
}

/// Search results and where they came from
#[derive(Debug, Clone)]
pub struct ResolvedRecipes {
    pub recipes: Vec<RecipeSummary>,
    pub source: ResultSource,
}

/// Cache-aside access to recipes
///
/// Reads go to the store first and fall through to the provider; everything the provider
/// returns is written back in the background so later lookups stay local.
#[derive(Clone)]
pub struct RecipeCacheStore {
    store: Arc<dyn RecipeStore>,
    provider: Arc<dyn RecipeProvider>,
    cache: Cache,
    tasks: BackgroundTasks,
    settings: CacheSettings,
}

fn excluded(preferences: Option<&UserPreferences>, names: &[String]) -> bool {
    preferences.is_some_and(|p| p.excludes(names))
}

impl RecipeCacheStore {
    pub fn new(
        store: Arc<dyn RecipeStore>,
        provider: Arc<dyn RecipeProvider>,
        cache: Cache,
        tasks: BackgroundTasks,
        settings: CacheSettings,
    ) -> Self {
        Self {
            store,
            provider,
            cache,
            tasks,
            settings,
        }
    }

    /// Recipes that can be made from the given normalized ingredients
    pub async fn resolve_by_ingredients(
        &self,
        ingredients: &[String],
        filters: &SearchFilters,
        count: Option<u32>,
        preferences: Option<&UserPreferences>,
    ) -> AppResult<ResolvedRecipes> {
        let count = count.unwrap_or(DEFAULT_COUNT).clamp(1, MAX_COUNT);
        let key = CacheKey::IngredientSearch(search_fingerprint(ingredients, filters, count));

        if let Some(recipes) = self.exact_hit(&key, ingredients, filters, preferences).await? {
            tracing::info!(cache_key = %key, count = recipes.len(), "Search index hit");
            return Ok(ResolvedRecipes {
                recipes,
                source: ResultSource::Cache,
            });
        }

        if let Some(recipes) = self
            .approximate_hit(ingredients, filters, count, preferences)
            .await?
        {
            tracing::info!(
                ingredients = ?ingredients,
                count = recipes.len(),
                "Recipe store hit"
            );
            return Ok(ResolvedRecipes {
                recipes,
                source: ResultSource::Cache,
            });
        }

        tracing::info!(
            ingredients = ?ingredients,
            provider = self.provider.name(),
            "Recipe store miss, querying provider"
        );

        let query = IngredientQuery::new(ingredients.to_vec(), count);
        let stubs = self.provider.find_by_ingredients(&query).await?;
        let ids: Vec<ExternalId> = stubs.iter().map(|s| ExternalId::Numeric(s.id)).collect();

        if ids.is_empty() {
            return Ok(ResolvedRecipes {
                recipes: Vec::new(),
                source: ResultSource::Provider,
            });
        }
        self.cache
            .set_in_background(&key, &ids, self.settings.search_ttl_secs);

        // Stubs carry no diet, cuisine or timing, so filtered searches resolve details first
        let recipes: Vec<RecipeSummary> = if filters.is_empty() {
            let recipes = stubs
                .into_iter()
                .map(RecipeSummary::from)
                .filter(|s| {
                    let names: Vec<String> = s.ingredient_names().cloned().collect();
                    !excluded(preferences, &names)
                })
                .collect();
            self.schedule_write_back(ids);
            recipes
        } else {
            self.resolve_many(&ids)
                .await?
                .iter()
                .filter(|r| filters.accepts(r))
                .filter(|r| !excluded(preferences, &r.ingredient_names()))
                .map(|r| RecipeSummary::from_recipe(r, ingredients))
                .collect()
        };

        Ok(ResolvedRecipes {
            recipes,
            source: ResultSource::Provider,
        })
    }

    /// Previous resolution of the exact same query, if every recipe is still stored
    async fn exact_hit(
        &self,
        key: &CacheKey,
        ingredients: &[String],
        filters: &SearchFilters,
        preferences: Option<&UserPreferences>,
    ) -> AppResult<Option<Vec<RecipeSummary>>> {
        let ids: Vec<ExternalId> = match self.cache.get_from_cache(key).await {
            Ok(Some(ids)) => ids,
            Ok(None) => return Ok(None),
            Err(e) => {
                tracing::warn!(error = %e, cache_key = %key, "Search index read failed");
                return Ok(None);
            }
        };
        if ids.is_empty() {
            return Ok(None);
        }

        let stored = self.store.find_many(&ids).await?;
        if stored.len() != ids.len() {
            return Ok(None);
        }

        let recipes: Vec<RecipeSummary> = stored
            .iter()
            .filter(|r| filters.accepts(r))
            .filter(|r| !excluded(preferences, &r.ingredient_names()))
            .map(|r| RecipeSummary::from_recipe(r, ingredients))
            .collect();
        if recipes.is_empty() {
            return Ok(None);
        }
        Ok(Some(recipes))
    }

    /// Stored recipes matching the query, when there are enough of them
    async fn approximate_hit(
        &self,
        ingredients: &[String],
        filters: &SearchFilters,
        count: u32,
        preferences: Option<&UserPreferences>,
    ) -> AppResult<Option<Vec<RecipeSummary>>> {
        let needed = (count as usize).min(APPROXIMATE_HIT_FLOOR);
        let candidates = self
            .store
            .find_by_ingredients(ingredients, self.settings.strictness, MAX_COUNT as usize)
            .await?;

        let mut matches: Vec<RecipeSummary> = candidates
            .iter()
            .filter(|r| filters.accepts(r))
            .filter(|r| !excluded(preferences, &r.ingredient_names()))
            .map(|r| RecipeSummary::from_recipe(r, ingredients))
            .collect();

        if matches.len() < needed {
            tracing::debug!(
                found = matches.len(),
                needed,
                "Not enough stored recipes for a cache hit"
            );
            return Ok(None);
        }

        // Most used ingredients first, then fewest missing, like the provider's ranking
        matches.sort_by(|a, b| {
            b.used_ingredient_count
                .cmp(&a.used_ingredient_count)
                .then_with(|| a.missed_ingredient_count.cmp(&b.missed_ingredient_count))
        });
        matches.truncate(count as usize);
        Ok(Some(matches))
    }

    fn schedule_write_back(&self, ids: Vec<ExternalId>) {
        let this = self.clone();
        self.tasks.spawn("recipe_cache.write_back", async move {
            match this.resolve_many(&ids).await {
                Ok(recipes) => tracing::info!(
                    requested = ids.len(),
                    stored = recipes.len(),
                    "Search results written back"
                ),
                Err(e) => tracing::warn!(error = %e, requested = ids.len(), "Write-back failed"),
            }
        });
    }

    /// Full recipe by provider id, fetched and stored on first access
    pub async fn resolve_details(&self, id: &ExternalId) -> AppResult<Recipe> {
        if let Some(recipe) = self.store.find_by_external_id(id).await? {
            tracing::debug!(recipe_id = %id, "Recipe details served from store");
            return Ok(recipe);
        }

        let detail = self.provider.get_details(id).await?;
        let recipe = self.store.upsert_recipe(detail.into_recipe(Utc::now())).await?;

        tracing::info!(
            recipe_id = %id,
            provider = self.provider.name(),
            "Recipe details fetched and stored"
        );
        Ok(recipe)
    }

    /// Full recipes for many ids, in input order
    ///
    /// Missing recipes are fetched in batches with a pause between batches. Failed fetches
    /// are logged and left out; the call only fails when nothing could be resolved.
    pub async fn resolve_many(&self, ids: &[ExternalId]) -> AppResult<Vec<Recipe>> {
        let mut found: HashMap<ExternalId, Recipe> = self
            .store
            .find_many(ids)
            .await?
            .into_iter()
            .map(|r| (r.external_id.clone(), r))
            .collect();

        let mut missing: Vec<ExternalId> = Vec::new();
        for id in ids {
            if !found.contains_key(id) && !missing.contains(id) {
                missing.push(id.clone());
            }
        }

        let mut first_error: Option<AppError> = None;
        let mut failures = 0;

        for (batch_index, batch) in missing.chunks(self.settings.batch_size).enumerate() {
            if batch_index > 0 {
                tokio::time::sleep(self.settings.batch_pause).await;
            }

            let mut tasks = Vec::new();
            for id in batch {
                let this = self.clone();
                let id = id.clone();
                tasks.push(tokio::spawn(async move {
                    let result = this.resolve_details(&id).await;
                    (id, result)
                }));
            }

            for task in tasks {
                match task.await {
                    Ok((_, Ok(recipe))) => {
                        found.insert(recipe.external_id.clone(), recipe);
                    }
                    Ok((id, Err(e))) => {
                        failures += 1;
                        tracing::warn!(error = %e, recipe_id = %id, "Recipe detail fetch failed");
                        first_error.get_or_insert(e);
                    }
                    Err(e) => {
                        failures += 1;
                        tracing::error!(error = %e, "Task join error");
                        first_error.get_or_insert(AppError::Internal(e.to_string()));
                    }
                }
            }
        }

        if failures > 0 {
            tracing::warn!(
                success_count = found.len(),
                error_count = failures,
                "Partial recipe detail resolution"
            );
        }

        if found.is_empty() {
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        let mut seen: Vec<&ExternalId> = Vec::new();
        let mut recipes = Vec::with_capacity(found.len());
        for id in ids {
            if seen.contains(&id) {
                continue;
            }
            seen.push(id);
            if let Some(recipe) = found.remove(id) {
                recipes.push(recipe);
            }
        }
        Ok(recipes)
    }
}
