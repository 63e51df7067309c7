use uuid::Uuid;

use crate::{
    config::MatchStrictness,
    error::AppResult,
    models::{ExternalId, MealPlan, PreferencesUpdate, Rating, Recipe, UserPreferences},
};

/// Persistence for recipes, user preferences and meal plans
///
/// Recipes are keyed by their provider id; at most one document exists per external id.
/// Writes that read-modify-write a recipe (ratings, favourites) must be atomic per recipe.
#[async_trait::async_trait]
pub trait RecipeStore: Send + Sync {
    async fn find_by_external_id(&self, id: &ExternalId) -> AppResult<Option<Recipe>>;

    /// Recipes for the given ids, in input order, skipping ids that are not stored
    async fn find_many(&self, ids: &[ExternalId]) -> AppResult<Vec<Recipe>>;

    /// Recipes whose ingredient names contain the query ingredients (case-insensitive)
    ///
    /// `strictness` decides whether one or every query ingredient must match.
    async fn find_by_ingredients(
        &self,
        ingredients: &[String],
        strictness: MatchStrictness,
        limit: usize,
    ) -> AppResult<Vec<Recipe>>;

    /// Inserts a recipe or refreshes the stored document for the same external id
    ///
    /// An existing document keeps its internal id, ratings and counters.
    async fn upsert_recipe(&self, recipe: Recipe) -> AppResult<Recipe>;

    /// Adds or replaces a user's rating and recomputes the aggregate atomically
    async fn record_rating(&self, id: &ExternalId, rating: Rating) -> AppResult<Recipe>;

    /// Toggles a favourite for the user, returning whether the recipe is now a favourite
    async fn toggle_favorite(&self, user_id: Uuid, id: &ExternalId) -> AppResult<bool>;

    /// Recipes with at least one rating, most rated first
    async fn rated_recipes(&self, limit: usize) -> AppResult<Vec<Recipe>>;

    /// Stored preferences, or defaults for an unknown user
    async fn get_preferences(&self, user_id: Uuid) -> AppResult<UserPreferences>;

    /// Applies a partial update to the user's preferences atomically
    async fn update_preferences(
        &self,
        user_id: Uuid,
        update: PreferencesUpdate,
    ) -> AppResult<UserPreferences>;

    /// Appends a search to the user's bounded history
    async fn record_search(
        &self,
        user_id: Uuid,
        ingredients: Vec<String>,
        limit: usize,
    ) -> AppResult<()>;

    /// Stores the plan as the user's active one, replacing any previous plan
    async fn save_meal_plan(&self, plan: &MealPlan) -> AppResult<()>;

    async fn active_meal_plan(&self, user_id: Uuid) -> AppResult<Option<MealPlan>>;
}

/// Whether a recipe's ingredient names satisfy a query under the given strictness
pub fn matches_ingredients(
    recipe: &Recipe,
    ingredients: &[String],
    strictness: MatchStrictness,
) -> bool {
    if ingredients.is_empty() {
        return false;
    }
    let names = recipe.ingredient_names();
    let contains = |wanted: &String| {
        let wanted = wanted.to_lowercase();
        names.iter().any(|name| name.contains(wanted.as_str()))
    };

    match strictness {
        MatchStrictness::Any => ingredients.iter().any(contains),
        MatchStrictness::All => ingredients.iter().all(contains),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::recipe::fixtures::recipe;

    #[test]
    fn test_matches_any_and_all() {
        let r = recipe(1, &["Chicken Thighs", "Jasmine rice"], &[]);
        let query = vec!["chicken".to_string(), "broccoli".to_string()];

        assert!(matches_ingredients(&r, &query, MatchStrictness::Any));
        assert!(!matches_ingredients(&r, &query, MatchStrictness::All));
        assert!(matches_ingredients(
            &r,
            &["rice".to_string(), "chicken".to_string()],
            MatchStrictness::All
        ));
        assert!(!matches_ingredients(&r, &[], MatchStrictness::Any));
    }
}
