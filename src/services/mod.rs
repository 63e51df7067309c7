pub mod background;
pub mod enhancement;
pub mod meal_plan;
pub mod normalizer;
pub mod preferences;
pub mod providers;
pub mod ratings;
pub mod recipe_cache;
pub mod retry;
pub mod shopping_list;
pub mod suggestions;

pub use background::{BackgroundTasks, BackgroundTasksHandle};
pub use enhancement::EnhancementGateway;
pub use meal_plan::MealPlanService;
pub use preferences::PreferencesService;
pub use ratings::RatingAggregator;
pub use recipe_cache::{CacheSettings, RecipeCacheStore};
pub use shopping_list::ShoppingListService;
pub use suggestions::SuggestionService;
