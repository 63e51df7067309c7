use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod enhancement;
pub mod meal_plan;
pub mod provider;
pub mod recipe;
pub mod user_preferences;

pub use enhancement::{
    Enhanceable, IngredientAnalysis, InteractionEvent, InteractionKind, RecipePayload,
    ShoppingListOptions,
};
pub use meal_plan::{Day, MealPlan, MealPlanEntry, MealType};
pub use provider::{IngredientQuery, RecipeDetail, RecipeStub};
pub use recipe::{
    ExternalId, Ingredient, Nutrition, Rating, Recipe, RecipeEnhancement, RecipeSummary,
    SearchFilters,
};
pub use user_preferences::{PreferencesUpdate, UserPreferences};

/// A value produced through the enhancement gateway
///
/// `enhanced` is false when the value is the non-AI fallback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Enhanced<T> {
    pub value: T,
    pub enhanced: bool,
}

impl<T> Enhanced<T> {
    pub fn enhanced(value: T) -> Self {
        Self {
            value,
            enhanced: true,
        }
    }

    pub fn fallback(value: T) -> Self {
        Self {
            value,
            enhanced: false,
        }
    }
}

/// Where a search result set came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    Cache,
    Provider,
}

/// Consolidated shopping list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShoppingList {
    pub items: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categorized: Option<BTreeMap<String, Vec<String>>>,
    pub recipe_count: usize,
    pub enhanced: bool,
}
