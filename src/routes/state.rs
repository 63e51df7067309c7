use std::sync::Arc;

use crate::{
    db::{Cache, RecipeStore},
    services::{
        providers::RecipeProvider, BackgroundTasks, CacheSettings, EnhancementGateway,
        MealPlanService, PreferencesService, RatingAggregator, RecipeCacheStore,
        ShoppingListService, SuggestionService,
    },
};

/// Everything the services are built from
pub struct AppDependencies {
    pub store: Arc<dyn RecipeStore>,
    pub provider: Arc<dyn RecipeProvider>,
    pub gateway: EnhancementGateway,
    pub cache: Cache,
    pub tasks: BackgroundTasks,
    pub cache_settings: CacheSettings,
    pub search_history_limit: usize,
}

/// Shared application state
///
/// Services are constructed once and cloned into handlers; each clone shares the same
/// store, provider client and background pool.
#[derive(Clone)]
pub struct AppState {
    pub recipes: RecipeCacheStore,
    pub suggestions: SuggestionService,
    pub ratings: RatingAggregator,
    pub meal_plans: MealPlanService,
    pub shopping_lists: ShoppingListService,
    pub preferences: PreferencesService,
    pub gateway: EnhancementGateway,
}

impl AppState {
    pub fn new(deps: AppDependencies) -> Self {
        let recipes = RecipeCacheStore::new(
            deps.store.clone(),
            deps.provider,
            deps.cache,
            deps.tasks.clone(),
            deps.cache_settings,
        );

        Self {
            suggestions: SuggestionService::new(
                deps.store.clone(),
                recipes.clone(),
                deps.gateway.clone(),
                deps.tasks,
                deps.search_history_limit,
            ),
            ratings: RatingAggregator::new(
                deps.store.clone(),
                recipes.clone(),
                deps.gateway.clone(),
            ),
            meal_plans: MealPlanService::new(
                deps.store.clone(),
                recipes.clone(),
                deps.gateway.clone(),
            ),
            preferences: PreferencesService::new(deps.store.clone()),
            shopping_lists: ShoppingListService::new(
                deps.store,
                recipes.clone(),
                deps.gateway.clone(),
            ),
            gateway: deps.gateway,
            recipes,
        }
    }
}
