use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::RecipeStore,
    error::{AppError, AppResult},
    models::{PreferencesUpdate, UserPreferences},
};

/// Upper bound on terms in any one preference list
const MAX_TERMS: usize = 50;

/// Reads and edits a user's dietary profile
#[derive(Clone)]
pub struct PreferencesService {
    store: Arc<dyn RecipeStore>,
}

impl PreferencesService {
    pub fn new(store: Arc<dyn RecipeStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, user_id: Uuid) -> AppResult<UserPreferences> {
        self.store.get_preferences(user_id).await
    }

    /// Applies the set fields of `update`; search history and favourites are untouched
    pub async fn update(
        &self,
        user_id: Uuid,
        update: PreferencesUpdate,
    ) -> AppResult<UserPreferences> {
        let lists = [
            ("dietary_restrictions", &update.dietary_restrictions),
            ("favorite_cuisines", &update.favorite_cuisines),
            ("allergies", &update.allergies),
            ("disliked_ingredients", &update.disliked_ingredients),
        ];
        for (field, terms) in lists {
            if terms.as_ref().is_some_and(|t| t.len() > MAX_TERMS) {
                return Err(AppError::Validation(format!(
                    "{} accepts at most {} entries",
                    field, MAX_TERMS
                )));
            }
        }

        let prefs = self.store.update_preferences(user_id, update).await?;
        tracing::info!(
            user_id = %user_id,
            allergies = prefs.allergies.len(),
            dislikes = prefs.disliked_ingredients.len(),
            restrictions = prefs.dietary_restrictions.len(),
            "Preferences updated"
        );
        Ok(prefs)
    }
}
