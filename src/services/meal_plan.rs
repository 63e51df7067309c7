use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::RecipeStore,
    error::{AppError, AppResult},
    models::{
        Day, InteractionEvent, InteractionKind, MealPlan, MealPlanEntry, MealType, Recipe,
        SearchFilters,
    },
    services::{
        enhancement::EnhancementGateway, normalizer::normalize_ingredients,
        recipe_cache::RecipeCacheStore,
    },
};

/// One recipe per day is the minimum for a plan
pub const MIN_CANDIDATES: usize = 7;
pub const SLOTS: usize = Day::ALL.len() * MealType::ALL.len();

fn require_candidates(candidates: &[Recipe]) -> AppResult<()> {
    if candidates.len() < MIN_CANDIDATES {
        return Err(AppError::InsufficientCandidates {
            required: MIN_CANDIDATES,
            available: candidates.len(),
        });
    }
    Ok(())
}

fn entry(recipe: &Recipe, day: Day, meal_type: MealType) -> MealPlanEntry {
    MealPlanEntry {
        recipe_id: recipe.external_id.clone(),
        title: recipe.title.clone(),
        day,
        meal_type,
    }
}

/// Fills the 21 (day, meal) slots from ranked candidates
///
/// For each slot, scans forward from the cursor (wrapping) for an unused candidate whose
/// dish types suit the meal, else takes the next unused one, else reuses `cursor mod pool`.
/// The cursor then moves past the chosen candidate.
pub fn assign(candidates: &[Recipe]) -> AppResult<Vec<MealPlanEntry>> {
    require_candidates(candidates)?;

    let pool = candidates.len();
    let mut used = vec![false; pool];
    let mut cursor = 0;
    let mut entries = Vec::with_capacity(SLOTS);

    for day in Day::ALL {
        for meal_type in MealType::ALL {
            let scan = (0..pool).map(|offset| (cursor + offset) % pool);

            let chosen = scan
                .clone()
                .find(|&i| !used[i] && meal_type.matches_dish_types(&candidates[i].dish_types))
                .or_else(|| scan.clone().find(|&i| !used[i]))
                .unwrap_or(cursor % pool);

            entries.push(entry(&candidates[chosen], day, meal_type));
            used[chosen] = true;
            cursor = chosen + 1;
        }
    }

    Ok(entries)
}

/// Degraded assignment: slot `i` gets candidate `i mod pool`
pub fn round_robin(candidates: &[Recipe]) -> AppResult<Vec<MealPlanEntry>> {
    require_candidates(candidates)?;

    let slots = Day::ALL
        .iter()
        .flat_map(|day| MealType::ALL.iter().map(move |meal| (*day, *meal)));

    Ok(slots
        .enumerate()
        .map(|(i, (day, meal_type))| entry(&candidates[i % candidates.len()], day, meal_type))
        .collect())
}

/// Builds and stores weekly plans for users
#[derive(Clone)]
pub struct MealPlanService {
    store: Arc<dyn RecipeStore>,
    recipes: RecipeCacheStore,
    gateway: EnhancementGateway,
}

impl MealPlanService {
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

    /// Generates a plan from the given ingredients, or the user's recent searches
    pub async fn generate_for_user(
        &self,
        user_id: Uuid,
        ingredients: Option<Vec<String>>,
    ) -> AppResult<MealPlan> {
        let preferences = self.store.get_preferences(user_id).await?;

        let ingredients = match ingredients {
            Some(list) => normalize_ingredients(&list),
            None => normalize_ingredients(&preferences.recent_ingredients()),
        };
        if ingredients.is_empty() {
            return Err(AppError::Validation(
                "Provide ingredients or search for recipes before generating a meal plan"
                    .to_string(),
            ));
        }

        let resolved = self
            .recipes
            .resolve_by_ingredients(
                &ingredients,
                &SearchFilters::default(),
                Some(SLOTS as u32),
                Some(&preferences),
            )
            .await?;

        let ids: Vec<_> = resolved
            .recipes
            .iter()
            .map(|s| s.external_id.clone())
            .collect();
        let candidates: Vec<Recipe> = self
            .recipes
            .resolve_many(&ids)
            .await?
            .into_iter()
            .filter(|r| !preferences.excludes(&r.ingredient_names()))
            .collect();

        require_candidates(&candidates)?;

        let ranked = self
            .gateway
            .enhance(candidates.clone(), Some(&preferences), &ingredients)
            .await;

        let (entries, enhanced) = if ranked.enhanced && ranked.value.len() >= MIN_CANDIDATES {
            (assign(&ranked.value)?, true)
        } else {
            tracing::info!(
                user_id = %user_id,
                candidates = candidates.len(),
                "Ranking unavailable, using round-robin meal plan"
            );
            (round_robin(&candidates)?, false)
        };

        let plan = MealPlan {
            user_id,
            entries,
            enhanced,
            generated_at: Utc::now(),
        };
        self.store.save_meal_plan(&plan).await?;

        tracing::info!(
            user_id = %user_id,
            recipes = plan.recipe_ids().len(),
            enhanced,
            "Meal plan generated"
        );

        self.gateway.train_from_interaction(
            InteractionEvent::new(Some(user_id), InteractionKind::MealPlan)
                .with_ingredients(ingredients),
        );

        Ok(plan)
    }

    /// The user's active plan
    pub async fn current_plan(&self, user_id: Uuid) -> AppResult<MealPlan> {
        self.store
            .active_meal_plan(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No meal plan for user {}", user_id)))
    }
}
