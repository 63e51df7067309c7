use serde::{Deserialize, Serialize};

use super::ExternalId;

/// Dietary profile and recent activity for one user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UserPreferences {
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    #[serde(default)]
    pub favorite_cuisines: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub disliked_ingredients: Vec<String>,
    /// Most recent ingredient searches, newest first
    #[serde(default)]
    pub recent_searches: Vec<Vec<String>>,
    #[serde(default)]
    pub favorite_recipes: Vec<ExternalId>,
}

/// Partial update of a user's dietary profile; unset fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PreferencesUpdate {
    #[serde(default)]
    pub dietary_restrictions: Option<Vec<String>>,
    #[serde(default)]
    pub favorite_cuisines: Option<Vec<String>>,
    #[serde(default)]
    pub allergies: Option<Vec<String>>,
    #[serde(default)]
    pub disliked_ingredients: Option<Vec<String>>,
}

fn clean_terms(terms: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::new();
    for term in terms {
        let term = term.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        if !term.is_empty() && !cleaned.contains(&term) {
            cleaned.push(term);
        }
    }
    cleaned
}

impl UserPreferences {
    /// Creates empty user preferences
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the fields set in `update`, trimming, lowercasing and deduplicating terms
    pub fn apply(&mut self, update: PreferencesUpdate) {
        if let Some(terms) = update.dietary_restrictions {
            self.dietary_restrictions = clean_terms(terms);
        }
        if let Some(terms) = update.favorite_cuisines {
            self.favorite_cuisines = clean_terms(terms);
        }
        if let Some(terms) = update.allergies {
            self.allergies = clean_terms(terms);
        }
        if let Some(terms) = update.disliked_ingredients {
            self.disliked_ingredients = clean_terms(terms);
        }
    }

    /// Records a search, keeping at most `limit` entries
    pub fn record_search(&mut self, ingredients: Vec<String>, limit: usize) {
        if ingredients.is_empty() {
            return;
        }
        // Repeat searches move to the front instead of duplicating
        self.recent_searches.retain(|s| *s != ingredients);
        self.recent_searches.insert(0, ingredients);
        self.recent_searches.truncate(limit);
    }

    /// Ingredients from recent searches, most recent first, without duplicates
    pub fn recent_ingredients(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for ingredient in self.recent_searches.iter().flatten() {
            if !seen.contains(ingredient) {
                seen.push(ingredient.clone());
            }
        }
        seen
    }

    /// Flips the favourite state of a recipe, returning whether it is now a favourite
    pub fn toggle_favorite(&mut self, recipe_id: &ExternalId) -> bool {
        if let Some(pos) = self.favorite_recipes.iter().position(|id| id == recipe_id) {
            self.favorite_recipes.remove(pos);
            false
        } else {
            self.favorite_recipes.push(recipe_id.clone());
            true
        }
    }

    /// Whether any ingredient name contains an allergen or disliked ingredient
    pub fn excludes<'a, I>(&self, ingredient_names: I) -> bool
    where
        I: IntoIterator<Item = &'a String>,
    {
        let blocked: Vec<String> = self
            .allergies
            .iter()
            .chain(self.disliked_ingredients.iter())
            .map(|b| b.trim().to_lowercase())
            .filter(|b| !b.is_empty())
            .collect();

        if blocked.is_empty() {
            return false;
        }

        ingredient_names.into_iter().any(|name| {
            let name = name.to_lowercase();
            blocked.iter().any(|b| name.contains(b.as_str()))
        })
    }
}
