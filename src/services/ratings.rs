use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::RecipeStore,
    error::{AppError, AppResult},
    models::{ExternalId, InteractionEvent, InteractionKind, Rating, Recipe},
    services::{enhancement::EnhancementGateway, recipe_cache::RecipeCacheStore},
};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// Weight never decays below this, so old ratings keep some influence
const MIN_WEIGHT: f64 = 0.1;
const DECAY_DAYS: f64 = 365.0;

/// Checks that a submitted rating is a whole number between 1 and 5
pub fn validate_rating(value: f64) -> AppResult<u8> {
    if !value.is_finite() || value.fract() != 0.0 {
        return Err(AppError::Validation(format!(
            "Rating must be a whole number, got {}",
            value
        )));
    }
    if value < MIN_RATING as f64 || value > MAX_RATING as f64 {
        return Err(AppError::Validation(format!(
            "Rating must be between {} and {}, got {}",
            MIN_RATING, MAX_RATING, value
        )));
    }
    Ok(value as u8)
}

/// Weight of a rating given its age: `max(0.1, 1 - age_days / 365)`
pub fn decay_weight(rated_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age_days = (now - rated_at).num_seconds().max(0) as f64 / 86_400.0;
    (1.0 - age_days / DECAY_DAYS).max(MIN_WEIGHT)
}

/// Time-decayed weighted mean of the ratings, rounded to two decimals
pub fn weighted_average(ratings: &[Rating], now: DateTime<Utc>) -> f64 {
    let (weighted_sum, total_weight) = ratings.iter().fold((0.0, 0.0), |(sum, total), r| {
        let weight = decay_weight(r.rated_at, now);
        (sum + r.value as f64 * weight, total + weight)
    });

    if total_weight == 0.0 {
        return 0.0;
    }
    (weighted_sum / total_weight * 100.0).round() / 100.0
}

/// Recomputes the aggregate rating and count from the ratings collection
pub fn recompute(recipe: &mut Recipe, now: DateTime<Utc>) {
    recipe.average_rating = weighted_average(&recipe.ratings, now);
    recipe.rating_count = recipe.ratings.len() as u32;
}

/// Stores a user's rating, replacing any earlier one from the same user, and recomputes
///
/// Stores call this while holding the recipe document exclusively.
pub fn apply_rating(recipe: &mut Recipe, rating: Rating, now: DateTime<Utc>) {
    match recipe.ratings.iter_mut().find(|r| r.user_id == rating.user_id) {
        Some(existing) => *existing = rating,
        None => recipe.ratings.push(rating),
    }
    recompute(recipe, now);
    recipe.updated_at = now;
}

/// Ranking score for trending recipes
pub fn trending_score(recipe: &Recipe) -> f64 {
    recipe.average_rating * (1.0 + recipe.rating_count as f64).ln() + 0.1 * recipe.favorite_count as f64
}

/// Handles rating and favourite writes and the trending read
#[derive(Clone)]
pub struct RatingAggregator {
    store: Arc<dyn RecipeStore>,
    recipes: RecipeCacheStore,
    gateway: EnhancementGateway,
}

impl RatingAggregator {
    pub fn new(
        store: Arc<dyn RecipeStore>,
        recipes: RecipeCacheStore,
        gateway: EnhancementGateway,
    ) -> Self {
        Self {
            store,
            recipes,
            gateway,
        }
    }

    /// Records a rating and returns the recipe with its refreshed aggregate
    pub async fn rate(&self, recipe_id: &ExternalId, user_id: Uuid, value: f64) -> AppResult<Recipe> {
        let value = validate_rating(value)?;

        // Make sure the recipe is stored before writing to it
        self.recipes.resolve_details(recipe_id).await?;

        let rating = Rating {
            user_id,
            value,
            rated_at: Utc::now(),
        };
        let recipe = self.store.record_rating(recipe_id, rating).await?;

        tracing::info!(
            recipe_id = %recipe_id,
            user_id = %user_id,
            rating = value,
            average = recipe.average_rating,
            count = recipe.rating_count,
            "Rating recorded"
        );

        self.gateway.train_from_interaction(
            InteractionEvent::new(Some(user_id), InteractionKind::Rating)
                .with_recipe(recipe_id)
                .with_rating(value),
        );

        Ok(recipe)
    }

    /// Flips a recipe in or out of the user's favourites, returning the new state
    pub async fn toggle_favorite(&self, recipe_id: &ExternalId, user_id: Uuid) -> AppResult<bool> {
        self.recipes.resolve_details(recipe_id).await?;
        let favorite = self.store.toggle_favorite(user_id, recipe_id).await?;

        tracing::info!(recipe_id = %recipe_id, user_id = %user_id, favorite, "Favorite toggled");

        let kind = if favorite {
            InteractionKind::Favorite
        } else {
            InteractionKind::Unfavorite
        };
        self.gateway.train_from_interaction(
            InteractionEvent::new(Some(user_id), kind).with_recipe(recipe_id),
        );

        Ok(favorite)
    }

    /// Rated recipes ordered by trending score
    pub async fn trending(&self, limit: usize) -> AppResult<Vec<Recipe>> {
        let limit = limit.clamp(1, 100);
        let mut recipes = self.store.rated_recipes(limit * 5).await?;

        // Ratings decay with time even without new writes
        let now = Utc::now();
        for recipe in recipes.iter_mut() {
            recompute(recipe, now);
        }

        recipes.sort_by(|a, b| {
            trending_score(b)
                .total_cmp(&trending_score(a))
                .then_with(|| a.external_id.cmp(&b.external_id))
        });
        recipes.truncate(limit);
        Ok(recipes)
    }
}
