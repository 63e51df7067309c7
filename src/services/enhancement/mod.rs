//! Best-effort AI enhancement
//!
//! Every call goes through [`EnhancementGateway::with_fallback`]: bounded retry, then a
//! non-AI fallback value flagged `enhanced = false`. Callers never see an enhancement error.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use crate::{
    models::{
        enhancement::{
            EnhanceRequest, EnhancedRecipePayload, PreferencePayload, ShoppingListRequest,
            TrainRequest,
        },
        Enhanceable, Enhanced, IngredientAnalysis, InteractionEvent, Recipe,
        ShoppingListOptions, UserPreferences,
    },
    services::{background::BackgroundTasks, retry::RetryPolicy},
};

pub mod client;
pub mod fallback;

pub use client::{
    DisabledEnhancementClient, EnhancementClient, EnhancementError, HttpEnhancementClient,
};

#[derive(Clone)]
pub struct EnhancementGateway {
    client: Arc<dyn EnhancementClient>,
    retry: RetryPolicy,
    tasks: BackgroundTasks,
}

/// Applies enhanced annotations onto the inputs in the service's order
///
/// Inputs the service dropped keep their relative order after the ranked ones.
fn merge_enhanced<T: Enhanceable>(
    items: Vec<T>,
    enhanced: Vec<EnhancedRecipePayload>,
) -> Result<Vec<T>, EnhancementError> {
    let mut pending: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let mut ranked = Vec::with_capacity(pending.len());

    for payload in enhanced {
        let position = pending.iter().position(|slot| {
            slot.as_ref()
                .is_some_and(|item| item.enhancement_key() == payload.id)
        });
        if let Some(mut item) = position.and_then(|p| pending[p].take()) {
            item.apply_enhancement(payload.into());
            ranked.push(item);
        }
    }

    if ranked.is_empty() {
        return Err(EnhancementError::InvalidResponse(
            "no enhanced recipe matched the request".to_string(),
        ));
    }

    ranked.extend(pending.into_iter().flatten());
    Ok(ranked)
}

impl EnhancementGateway {
    pub fn new(client: Arc<dyn EnhancementClient>, retry: RetryPolicy, tasks: BackgroundTasks) -> Self {
        Self {
            client,
            retry,
            tasks,
        }
    }

    /// A gateway that always falls back
    pub fn disabled(tasks: BackgroundTasks) -> Self {
        Self::new(
            Arc::new(DisabledEnhancementClient),
            RetryPolicy::no_retry(),
            tasks,
        )
    }

    /// Runs `call` under the retry policy, returning `fallback()` when it cannot succeed
    async fn with_fallback<T, F, Fut, D>(&self, operation: &'static str, call: F, fallback: D) -> Enhanced<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, EnhancementError>>,
        D: FnOnce() -> T,
    {
        match self
            .retry
            .run(operation, call, |e: &EnhancementError, _| e.is_retryable())
            .await
        {
            Ok(value) => Enhanced::enhanced(value),
            Err(EnhancementError::Disabled) => {
                tracing::debug!(operation, "Enhancement disabled, using fallback");
                Enhanced::fallback(fallback())
            }
            Err(e) => {
                tracing::warn!(operation, error = %e, "Enhancement failed, using fallback");
                Enhanced::fallback(fallback())
            }
        }
    }

    /// Re-ranks and annotates recipes; on failure returns them untouched
    pub async fn enhance<T: Enhanceable>(
        &self,
        items: Vec<T>,
        preferences: Option<&UserPreferences>,
        ingredients: &[String],
    ) -> Enhanced<Vec<T>> {
        if items.is_empty() {
            return Enhanced::fallback(items);
        }

        let request = EnhanceRequest {
            recipes: items.iter().map(Enhanceable::to_payload).collect(),
            user_preferences: preferences.map(PreferencePayload::from),
            ingredients: ingredients.to_vec(),
        };

        let client = self.client.as_ref();
        let request = &request;
        let inputs = &items;
        let result = self
            .with_fallback(
                "enhancement.enhance_recipes",
                move || async move {
                    let response = client.enhance_recipes(request).await?;
                    merge_enhanced(inputs.clone(), response.recipes)
                },
                Vec::new,
            )
            .await;

        if result.enhanced {
            tracing::debug!(count = result.value.len(), "Recipes enhanced");
            result
        } else {
            Enhanced::fallback(items)
        }
    }

    /// Cuisine categories, food groups and pairing suggestions for the ingredients
    pub async fn analyze_ingredients(&self, ingredients: &[String]) -> Enhanced<IngredientAnalysis> {
        let client = self.client.as_ref();
        self.with_fallback(
            "enhancement.analyze_ingredients",
            move || async move {
                client
                    .analyze_ingredients(ingredients)
                    .await
                    .map(IngredientAnalysis::from)
            },
            || fallback::local_analysis(ingredients),
        )
        .await
    }

    /// Cooking tips for a recipe; no tips when the service is unavailable
    pub async fn cooking_tips(&self, recipe: &Recipe) -> Enhanced<Vec<String>> {
        let client = self.client.as_ref();
        let payload = recipe.to_payload();
        let payload = &payload;
        self.with_fallback(
            "enhancement.cooking_tips",
            move || async move { client.cooking_tips(payload).await.map(|r| r.tips) },
            Vec::new,
        )
        .await
    }

    /// Groups shopping items into store categories; `None` when the service is unavailable
    pub async fn shopping_list(
        &self,
        items: &[String],
        options: ShoppingListOptions,
    ) -> Enhanced<Option<BTreeMap<String, Vec<String>>>> {
        if items.is_empty() {
            return Enhanced::fallback(None);
        }

        let client = self.client.as_ref();
        let request = ShoppingListRequest {
            ingredients: items.to_vec(),
            options,
        };
        let request = &request;
        self.with_fallback(
            "enhancement.shopping_list",
            move || async move { client.shopping_list(request).await.map(|r| Some(r.categories)) },
            || None,
        )
        .await
    }

    /// Forwards an interaction for model training without waiting for it
    pub fn train_from_interaction(&self, event: InteractionEvent) {
        let gateway = self.clone();
        self.tasks.spawn("enhancement.train", async move {
            let request = TrainRequest {
                training_data: vec![event],
                force_retrain: false,
            };
            let client = gateway.client.as_ref();
            let request = &request;
            gateway
                .with_fallback(
                    "enhancement.train",
                    move || async move { client.train(request).await },
                    || (),
                )
                .await;
        });
    }
}
