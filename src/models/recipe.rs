use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use uuid::Uuid;

use crate::error::AppError;

/// Identifier assigned by the external recipe provider
///
/// The provider uses integers, but user-facing references and some legacy records carry
/// string identifiers, so both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExternalId {
    Numeric(i64),
    Text(String),
}

impl Display for ExternalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExternalId::Numeric(id) => write!(f, "{}", id),
            ExternalId::Text(id) => write!(f, "{}", id),
        }
    }
}

impl FromStr for ExternalId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "Recipe id cannot be empty".to_string(),
            ));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(AppError::Validation(format!(
                "Malformed recipe id: {}",
                trimmed
            )));
        }

        Ok(match trimmed.parse::<i64>() {
            Ok(n) => ExternalId::Numeric(n),
            Err(_) => ExternalId::Text(trimmed.to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub amount: f64,
    #[serde(default)]
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Nutrition {
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
}

/// A single user's rating of a recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: Uuid,
    pub value: u8,
    pub rated_at: DateTime<Utc>,
}

/// Annotations produced by the enhancement service
///
/// Kept apart from the recipe's own fields so that enhancement can never overwrite a
/// recipe's identity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecipeEnhancement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub normalized_ingredients: Vec<String>,
}

/// Stored recipe document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: Uuid,
    pub external_id: ExternalId,
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    pub ready_in_minutes: u32,
    pub servings: u32,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
    #[serde(default)]
    pub nutrition: Nutrition,
    #[serde(default)]
    pub dish_types: Vec<String>,
    #[serde(default)]
    pub cuisines: Vec<String>,
    #[serde(default)]
    pub diets: Vec<String>,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub ratings: Vec<Rating>,
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub rating_count: u32,
    #[serde(default)]
    pub favorite_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhancement: Option<RecipeEnhancement>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recipe {
    /// Lowercased ingredient names
    pub fn ingredient_names(&self) -> Vec<String> {
        self.ingredients
            .iter()
            .map(|i| i.name.trim().to_lowercase())
            .collect()
    }

    /// Applies a fresh provider fetch onto an existing record
    ///
    /// Identity, ratings and counters belong to this service and are left untouched.
    pub fn refresh_from(&mut self, fetched: Recipe) {
        self.title = fetched.title;
        self.summary = fetched.summary;
        self.image = fetched.image;
        self.ready_in_minutes = fetched.ready_in_minutes;
        self.servings = fetched.servings;
        self.ingredients = fetched.ingredients;
        self.instructions = fetched.instructions;
        self.nutrition = fetched.nutrition;
        self.dish_types = fetched.dish_types;
        self.cuisines = fetched.cuisines;
        self.diets = fetched.diets;
        self.popularity = fetched.popularity;
        self.updated_at = fetched.updated_at;
    }
}

/// Search result shape returned for ingredient queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeSummary {
    #[serde(rename = "id")]
    pub external_id: ExternalId,
    pub title: String,
    #[serde(default)]
    pub image: Option<String>,
    pub used_ingredients: Vec<String>,
    pub missed_ingredients: Vec<String>,
    pub used_ingredient_count: u32,
    pub missed_ingredient_count: u32,
    #[serde(default)]
    pub likes: f64,
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub rating_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhancement: Option<RecipeEnhancement>,
}

impl RecipeSummary {
    /// Builds a summary of a stored recipe relative to the ingredients the user has
    pub fn from_recipe(recipe: &Recipe, available: &[String]) -> Self {
        let (used, missed): (Vec<String>, Vec<String>) = recipe
            .ingredient_names()
            .into_iter()
            .partition(|name| available.iter().any(|a| name.contains(a.as_str())));

        Self {
            external_id: recipe.external_id.clone(),
            title: recipe.title.clone(),
            image: recipe.image.clone(),
            used_ingredient_count: used.len() as u32,
            missed_ingredient_count: missed.len() as u32,
            used_ingredients: used,
            missed_ingredients: missed,
            likes: recipe.popularity,
            average_rating: recipe.average_rating,
            rating_count: recipe.rating_count,
            enhancement: recipe.enhancement.clone(),
        }
    }

    pub fn ingredient_names(&self) -> impl Iterator<Item = &String> {
        self.used_ingredients
            .iter()
            .chain(self.missed_ingredients.iter())
    }
}

/// Optional narrowing of an ingredient search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_ready_time: Option<u32>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.diet.is_none() && self.cuisine.is_none() && self.max_ready_time.is_none()
    }

    /// Whether a stored recipe satisfies every filter that is set
    pub fn accepts(&self, recipe: &Recipe) -> bool {
        let tag_match = |wanted: &Option<String>, tags: &[String]| match wanted {
            Some(w) => tags.iter().any(|t| t.eq_ignore_ascii_case(w.trim())),
            None => true,
        };

        tag_match(&self.diet, &recipe.diets)
            && tag_match(&self.cuisine, &recipe.cuisines)
            && self
                .max_ready_time
                .map_or(true, |max| recipe.ready_in_minutes <= max)
    }
}
