// ============================================================================
// Enhancement service API types
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::{Recipe, RecipeEnhancement, RecipeSummary, UserPreferences};

/// Recipe as sent to the enhancement service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipePayload {
    pub id: String,
    pub title: String,
    pub ingredients: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub instructions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub popularity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooking_time_minutes: Option<u32>,
}

/// Anything the gateway can rank and annotate
pub trait Enhanceable: Clone + Send + Sync {
    /// Stable key used to match enhanced results back to inputs
    fn enhancement_key(&self) -> String;

    fn to_payload(&self) -> RecipePayload;

    fn apply_enhancement(&mut self, enhancement: RecipeEnhancement);
}

impl Enhanceable for Recipe {
    fn enhancement_key(&self) -> String {
        self.external_id.to_string()
    }

    fn to_payload(&self) -> RecipePayload {
        RecipePayload {
            id: self.enhancement_key(),
            title: self.title.clone(),
            ingredients: self.ingredient_names(),
            instructions: self.instructions.clone(),
            cuisine: self.cuisines.first().cloned(),
            tags: self
                .dish_types
                .iter()
                .chain(self.diets.iter())
                .cloned()
                .collect(),
            popularity: self.popularity + self.average_rating * self.rating_count as f64,
            cooking_time_minutes: (self.ready_in_minutes > 0).then_some(self.ready_in_minutes),
        }
    }

    fn apply_enhancement(&mut self, enhancement: RecipeEnhancement) {
        self.enhancement = Some(enhancement);
    }
}

impl Enhanceable for RecipeSummary {
    fn enhancement_key(&self) -> String {
        self.external_id.to_string()
    }

    fn to_payload(&self) -> RecipePayload {
        RecipePayload {
            id: self.enhancement_key(),
            title: self.title.clone(),
            ingredients: self.ingredient_names().cloned().collect(),
            instructions: Vec::new(),
            cuisine: None,
            tags: Vec::new(),
            popularity: self.likes + self.average_rating * self.rating_count as f64,
            cooking_time_minutes: None,
        }
    }

    fn apply_enhancement(&mut self, enhancement: RecipeEnhancement) {
        self.enhancement = Some(enhancement);
    }
}

/// Preference data in the shape the enhancement service expects
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreferencePayload {
    pub favorites: Vec<String>,
    pub dietary_restrictions: Vec<String>,
    pub cuisine_preferences: Vec<String>,
}

impl From<&UserPreferences> for PreferencePayload {
    fn from(prefs: &UserPreferences) -> Self {
        Self {
            favorites: prefs.favorite_recipes.iter().map(|id| id.to_string()).collect(),
            dietary_restrictions: prefs.dietary_restrictions.clone(),
            cuisine_preferences: prefs.favorite_cuisines.clone(),
        }
    }
}

/// POST /enhance-recipes body
#[derive(Debug, Clone, Serialize)]
pub struct EnhanceRequest {
    pub recipes: Vec<RecipePayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_preferences: Option<PreferencePayload>,
    pub ingredients: Vec<String>,
}

/// Accepts numeric or string ids
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

/// A recipe as returned by the enhancement service
///
/// Only the annotation fields are read; anything else the service echoes back is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct EnhancedRecipePayload {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(default)]
    pub ai_relevance_score: Option<f64>,
    #[serde(default)]
    pub ai_rank: Option<u32>,
    #[serde(default)]
    pub complexity: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub cooking_time_minutes: Option<u32>,
    #[serde(default)]
    pub estimated_time: bool,
    #[serde(default)]
    pub normalized_ingredients: Vec<String>,
}

impl From<EnhancedRecipePayload> for RecipeEnhancement {
    fn from(payload: EnhancedRecipePayload) -> Self {
        RecipeEnhancement {
            relevance_score: payload.ai_relevance_score.filter(|s| s.is_finite()),
            rank: payload.ai_rank,
            complexity: payload.complexity.map(|c| c.clamp(0.0, 1.0)),
            tags: payload.tags,
            // Only report times the service had to guess
            estimated_minutes: if payload.estimated_time {
                payload.cooking_time_minutes
            } else {
                None
            },
            normalized_ingredients: payload.normalized_ingredients,
        }
    }
}

/// POST /enhance-recipes response
#[derive(Debug, Clone, Deserialize)]
pub struct EnhanceResponse {
    pub recipes: Vec<EnhancedRecipePayload>,
    #[serde(default)]
    pub enhancement_quality: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryMatch {
    pub name: String,
    pub match_score: f64,
}

/// Result of analysing a set of ingredients
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IngredientAnalysis {
    #[serde(default)]
    pub suitable_categories: Vec<CategoryMatch>,
    #[serde(default)]
    pub ingredient_groups: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub suggested_additions: Vec<String>,
}

/// POST /analyze-ingredients response
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeResponse {
    pub analysis: AnalysisBody,
    #[serde(default)]
    pub suggested_additions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisBody {
    #[serde(default)]
    pub suitable_categories: Vec<CategoryMatch>,
    #[serde(default)]
    pub ingredient_groups: BTreeMap<String, Vec<String>>,
}

impl From<AnalyzeResponse> for IngredientAnalysis {
    fn from(response: AnalyzeResponse) -> Self {
        IngredientAnalysis {
            suitable_categories: response.analysis.suitable_categories,
            ingredient_groups: response.analysis.ingredient_groups,
            suggested_additions: response.suggested_additions,
        }
    }
}

/// POST /cooking-tips response
#[derive(Debug, Clone, Deserialize)]
pub struct CookingTipsResponse {
    #[serde(default)]
    pub tips: Vec<String>,
}

/// Options forwarded when categorising a shopping list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShoppingListOptions {
    #[serde(default)]
    pub estimate_quantities: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dietary_restrictions: Vec<String>,
}

/// POST /shopping-list body
#[derive(Debug, Clone, Serialize)]
pub struct ShoppingListRequest {
    pub ingredients: Vec<String>,
    #[serde(flatten)]
    pub options: ShoppingListOptions,
}

/// POST /shopping-list response
#[derive(Debug, Clone, Deserialize)]
pub struct ShoppingListResponse {
    pub categories: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Search,
    Rating,
    Favorite,
    Unfavorite,
    MealPlan,
}

/// A user interaction forwarded to the enhancement service for training
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionEvent {
    pub user_id: Option<Uuid>,
    pub kind: InteractionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ingredients: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_rating: Option<u8>,
    pub occurred_at: DateTime<Utc>,
}

impl InteractionEvent {
    pub fn new(user_id: Option<Uuid>, kind: InteractionKind) -> Self {
        Self {
            user_id,
            kind,
            recipe_id: None,
            ingredients: Vec::new(),
            user_rating: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn with_recipe(mut self, recipe_id: impl ToString) -> Self {
        self.recipe_id = Some(recipe_id.to_string());
        self
    }

    pub fn with_ingredients(mut self, ingredients: Vec<String>) -> Self {
        self.ingredients = ingredients;
        self
    }

    pub fn with_rating(mut self, rating: u8) -> Self {
        self.user_rating = Some(rating);
        self
    }
}

/// POST /train body
#[derive(Debug, Clone, Serialize)]
pub struct TrainRequest {
    pub training_data: Vec<InteractionEvent>,
    pub force_retrain: bool,
}
