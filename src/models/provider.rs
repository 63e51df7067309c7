// ============================================================================
// Recipe provider API types
// ============================================================================

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::{ExternalId, Ingredient, Nutrition, Recipe, RecipeSummary};

/// Maximum number of ingredients the provider accepts in one query
pub const MAX_QUERY_INGREDIENTS: usize = 20;
/// Provider limit on results per search
pub const MAX_RESULTS: u32 = 100;

/// Parameters for an ingredient search
#[derive(Debug, Clone, PartialEq)]
pub struct IngredientQuery {
    pub ingredients: Vec<String>,
    pub count: u32,
}

impl IngredientQuery {
    /// Builds a query within provider limits
    pub fn new(ingredients: Vec<String>, count: u32) -> Self {
        let mut ingredients = ingredients;
        ingredients.truncate(MAX_QUERY_INGREDIENTS);
        Self {
            ingredients,
            count: count.clamp(1, MAX_RESULTS),
        }
    }
}

/// Ingredient reference inside a search result
#[derive(Debug, Clone, Deserialize)]
pub struct StubIngredient {
    #[serde(default)]
    pub name: String,
}

/// GET /recipes/findByIngredients result item
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeStub {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub used_ingredient_count: u32,
    #[serde(default)]
    pub missed_ingredient_count: u32,
    #[serde(default)]
    pub used_ingredients: Vec<StubIngredient>,
    #[serde(default)]
    pub missed_ingredients: Vec<StubIngredient>,
    #[serde(default)]
    pub likes: f64,
}

fn names(items: Vec<StubIngredient>) -> Vec<String> {
    items
        .into_iter()
        .map(|i| i.name.trim().to_lowercase())
        .filter(|n| !n.is_empty())
        .collect()
}

impl From<RecipeStub> for RecipeSummary {
    fn from(stub: RecipeStub) -> Self {
        RecipeSummary {
            external_id: ExternalId::Numeric(stub.id),
            title: stub.title,
            image: stub.image,
            used_ingredient_count: stub.used_ingredient_count,
            missed_ingredient_count: stub.missed_ingredient_count,
            used_ingredients: names(stub.used_ingredients),
            missed_ingredients: names(stub.missed_ingredients),
            likes: stub.likes.max(0.0),
            average_rating: 0.0,
            rating_count: 0,
            enhancement: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiIngredient {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub unit: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiInstructionStep {
    #[serde(default)]
    pub number: u32,
    pub step: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiInstructions {
    #[serde(default)]
    pub steps: Vec<ApiInstructionStep>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiNutrient {
    pub name: String,
    #[serde(default)]
    pub amount: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiNutrition {
    #[serde(default)]
    pub nutrients: Vec<ApiNutrient>,
}

/// GET /recipes/{id}/information response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDetail {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub ready_in_minutes: Option<i64>,
    #[serde(default)]
    pub servings: Option<i64>,
    #[serde(default)]
    pub extended_ingredients: Vec<ApiIngredient>,
    #[serde(default)]
    pub analyzed_instructions: Vec<ApiInstructions>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub nutrition: Option<ApiNutrition>,
    #[serde(default)]
    pub dish_types: Vec<String>,
    #[serde(default)]
    pub cuisines: Vec<String>,
    #[serde(default)]
    pub diets: Vec<String>,
    #[serde(default)]
    pub aggregate_likes: Option<f64>,
}

impl RecipeDetail {
    /// Converts the provider payload into a new recipe document, coercing out-of-range values
    pub fn into_recipe(self, now: DateTime<Utc>) -> Recipe {
        let mut steps: Vec<(u32, String)> = self
            .analyzed_instructions
            .into_iter()
            .flat_map(|block| block.steps)
            .map(|s| (s.number, s.step.trim().to_string()))
            .filter(|(_, s)| !s.is_empty())
            .collect();
        steps.sort_by_key(|(number, _)| *number);

        let mut instructions: Vec<String> = steps.into_iter().map(|(_, s)| s).collect();
        if instructions.is_empty() {
            instructions = self
                .instructions
                .as_deref()
                .unwrap_or_default()
                .split(['\n', '.'])
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| format!("{}.", s))
                .collect();
        }

        let nutrient = |wanted: &str| -> f64 {
            self.nutrition
                .as_ref()
                .and_then(|n| n.nutrients.iter().find(|x| x.name.eq_ignore_ascii_case(wanted)))
                .map(|x| x.amount.max(0.0))
                .unwrap_or(0.0)
        };
        let nutrition = Nutrition {
            calories: nutrient("Calories"),
            protein: nutrient("Protein"),
            fat: nutrient("Fat"),
            carbs: nutrient("Carbohydrates"),
        };

        let ingredients = self
            .extended_ingredients
            .into_iter()
            .filter(|i| !i.name.trim().is_empty())
            .map(|i| Ingredient {
                name: i.name.trim().to_string(),
                amount: if i.amount.is_finite() { i.amount.max(0.0) } else { 0.0 },
                unit: i.unit,
            })
            .collect();

        Recipe {
            id: Uuid::new_v4(),
            external_id: ExternalId::Numeric(self.id),
            title: self.title,
            summary: self.summary,
            image: self.image,
            ready_in_minutes: self.ready_in_minutes.unwrap_or(0).clamp(0, u32::MAX as i64) as u32,
            servings: self.servings.unwrap_or(1).clamp(1, u32::MAX as i64) as u32,
            ingredients,
            instructions,
            nutrition,
            dish_types: self.dish_types,
            cuisines: self.cuisines,
            diets: self.diets,
            popularity: self.aggregate_likes.unwrap_or(0.0).max(0.0),
            ratings: Vec::new(),
            average_rating: 0.0,
            rating_count: 0,
            favorite_count: 0,
            enhancement: None,
            created_at: now,
            updated_at: now,
        }
    }
}
