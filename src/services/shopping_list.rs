use std::collections::BTreeSet;
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::RecipeStore,
    error::{AppError, AppResult},
    models::{ExternalId, Recipe, ShoppingList, ShoppingListOptions},
    services::{
        enhancement::EnhancementGateway, normalizer::normalize_name,
        recipe_cache::RecipeCacheStore,
    },
};

/// Sorted, de-duplicated ingredient names across the recipes
pub fn consolidate(recipes: &[Recipe]) -> Vec<String> {
    recipes
        .iter()
        .flat_map(|r| r.ingredients.iter())
        .map(|i| normalize_name(&i.name))
        .filter(|name| !name.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Where the recipes for a shopping list come from
#[derive(Debug, Clone, PartialEq)]
pub enum ShoppingListSource {
    Recipes(Vec<ExternalId>),
    ActiveMealPlan,
}

impl ShoppingListSource {
    /// Exactly one of explicit recipe ids or the active plan must be chosen
    pub fn from_request(recipe_ids: Option<Vec<ExternalId>>, from_meal_plan: bool) -> AppResult<Self> {
        match (recipe_ids, from_meal_plan) {
            (Some(ids), false) if !ids.is_empty() => Ok(ShoppingListSource::Recipes(ids)),
            (None, true) => Ok(ShoppingListSource::ActiveMealPlan),
            (Some(_), true) => Err(AppError::Validation(
                "Provide either recipe ids or the meal plan flag, not both".to_string(),
            )),
            _ => Err(AppError::Validation(
                "Provide recipe ids or set from_meal_plan".to_string(),
            )),
        }
    }
}

#[derive(Clone)]
pub struct ShoppingListService {
    store: Arc<dyn RecipeStore>,
    recipes: RecipeCacheStore,
    gateway: EnhancementGateway,
}

impl ShoppingListService {
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

    pub async fn build(
        &self,
        user_id: Option<Uuid>,
        source: ShoppingListSource,
        mut options: ShoppingListOptions,
    ) -> AppResult<ShoppingList> {
        let ids = match source {
            ShoppingListSource::Recipes(ids) => ids,
            ShoppingListSource::ActiveMealPlan => {
                let user_id = user_id.ok_or_else(|| {
                    AppError::Validation("A user id is required to use the meal plan".to_string())
                })?;
                self.store
                    .active_meal_plan(user_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::NotFound(format!("No meal plan for user {}", user_id))
                    })?
                    .recipe_ids()
            }
        };

        let recipes = self.recipes.resolve_many(&ids).await?;
        let items = consolidate(&recipes);

        if let Some(user_id) = user_id {
            if options.dietary_restrictions.is_empty() {
                options.dietary_restrictions =
                    self.store.get_preferences(user_id).await?.dietary_restrictions;
            }
        }

        let categorized = self.gateway.shopping_list(&items, options).await;

        tracing::info!(
            recipe_count = recipes.len(),
            items = items.len(),
            enhanced = categorized.enhanced,
            "Shopping list built"
        );

        Ok(ShoppingList {
            items,
            categorized: categorized.value,
            recipe_count: recipes.len(),
            enhanced: categorized.enhanced,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Cache, InMemoryStore};
    use crate::models::recipe::fixtures::recipe;
    use crate::services::{
        background::BackgroundTasks, providers::MockRecipeProvider, recipe_cache::CacheSettings,
    };

    #[test]
    fn test_consolidate_example() {
        let recipes = vec![
            recipe(1, &["Egg", "flour"], &[]),
            recipe(2, &["egg ", "Milk"], &[]),
        ];
        assert_eq!(consolidate(&recipes), vec!["egg", "flour", "milk"]);
    }

    #[test]
    fn test_consolidate_collapses_whitespace_and_skips_blank() {
        let recipes = vec![recipe(1, &["Soy   Sauce", "  ", "soy sauce"], &[])];
        assert_eq!(consolidate(&recipes), vec!["soy sauce"]);
    }

    #[test]
    fn test_source_requires_exactly_one() {
        let ids = vec![ExternalId::Numeric(1)];
        assert_eq!(
            ShoppingListSource::from_request(Some(ids.clone()), false).unwrap(),
            ShoppingListSource::Recipes(ids.clone())
        );
        assert_eq!(
            ShoppingListSource::from_request(None, true).unwrap(),
            ShoppingListSource::ActiveMealPlan
        );
        assert!(matches!(
            ShoppingListSource::from_request(None, false),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            ShoppingListSource::from_request(Some(ids), true),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            ShoppingListSource::from_request(Some(vec![]), false),
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_build_merges_case_and_whitespace_variants() {
        let store = InMemoryStore::new();
        store
            .upsert_recipe(recipe(1, &["egg", "Egg ", " flour"], &[]))
            .await
            .unwrap();
        store
            .upsert_recipe(recipe(2, &["flour", "milk"], &[]))
            .await
            .unwrap();

        let mut provider = MockRecipeProvider::new();
        provider.expect_get_details().times(0);
        provider.expect_name().return_const("mock");

        let (cache, _cache_handle) = Cache::in_memory();
        let (tasks, _tasks_handle) = BackgroundTasks::new(2);
        let store: Arc<dyn RecipeStore> = Arc::new(store);
        let recipes = RecipeCacheStore::new(
            store.clone(),
            Arc::new(provider),
            cache,
            tasks.clone(),
            CacheSettings::default(),
        );
        let service = ShoppingListService::new(store, recipes, EnhancementGateway::disabled(tasks));

        let list = service
            .build(
                None,
                ShoppingListSource::Recipes(vec![ExternalId::Numeric(1), ExternalId::Numeric(2)]),
                ShoppingListOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(list.items, vec!["egg", "flour", "milk"]);
        assert_eq!(list.recipe_count, 2);
        assert!(!list.enhanced);
        assert!(list.categorized.is_none());
    }
}
