/// Spoonacular recipe API provider
///
/// API Flow:
/// 1. Ingredient search: /recipes/findByIngredients → lightweight stubs with used/missed ingredients
/// 2. Details: /recipes/{id}/information?includeNutrition=true → full recipe with nutrition
use std::time::Duration;

use reqwest::Client as HttpClient;

use crate::{
    error::{AppError, AppResult},
    models::{ExternalId, IngredientQuery, RecipeDetail, RecipeStub},
    services::{
        providers::{ProviderError, RecipeProvider},
        retry::RetryPolicy,
    },
};

#[derive(Clone)]
pub struct SpoonacularProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    retry: RetryPolicy,
}

impl SpoonacularProvider {
    /// Creates a provider whose requests time out after `timeout`
    pub fn new(
        api_key: String,
        api_url: String,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> AppResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            retry,
        })
    }

    /// Sends a GET request and decodes the JSON body, classifying failures
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let response = self
            .http_client
            .get(url)
            .query(query)
            .query(&[("apiKey", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(
                provider = self.name(),
                status = status.as_u16(),
                body_len = body.len(),
                "Recipe provider returned an error status"
            );
            let error = ProviderError::from_status(status.as_u16(), body);
            if matches!(error, ProviderError::AuthFailure { .. }) {
                tracing::error!(
                    provider = self.name(),
                    status = status.as_u16(),
                    "Recipe provider rejected our credentials"
                );
            }
            return Err(error);
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }
}

#[async_trait::async_trait]
impl RecipeProvider for SpoonacularProvider {
    async fn find_by_ingredients(
        &self,
        query: &IngredientQuery,
    ) -> Result<Vec<RecipeStub>, ProviderError> {
        let url = format!("{}/recipes/findByIngredients", self.api_url);
        let params = [
            ("ingredients", query.ingredients.join(",")),
            ("number", query.count.to_string()),
            // Maximise used ingredients, then minimise missing ones
            ("ranking", "2".to_string()),
            ("ignorePantry", "true".to_string()),
        ];

        let stubs: Vec<RecipeStub> = self
            .retry
            .run(
                "provider.find_by_ingredients",
                || self.get_json(&url, &params),
                ProviderError::is_retryable,
            )
            .await?;

        tracing::info!(
            provider = self.name(),
            ingredients = ?query.ingredients,
            count = stubs.len(),
            "Fetched recipes by ingredients"
        );

        Ok(stubs)
    }

    async fn get_details(&self, id: &ExternalId) -> Result<RecipeDetail, ProviderError> {
        // Provider ids are numeric; anything else cannot exist there
        let numeric_id = match id {
            ExternalId::Numeric(n) => *n,
            ExternalId::Text(_) => return Err(ProviderError::NotFound(id.to_string())),
        };

        let url = format!("{}/recipes/{}/information", self.api_url, numeric_id);
        let params = [("includeNutrition", "true".to_string())];

        let detail: RecipeDetail = self
            .retry
            .run(
                "provider.get_details",
                || self.get_json(&url, &params),
                ProviderError::is_retryable,
            )
            .await
            .map_err(|e| match e {
                ProviderError::NotFound(_) => ProviderError::NotFound(id.to_string()),
                other => other,
            })?;

        tracing::debug!(provider = self.name(), recipe_id = %id, "Fetched recipe details");
        Ok(detail)
    }

    fn name(&self) -> &'static str {
        "spoonacular"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> SpoonacularProvider {
        SpoonacularProvider::new(
            "test-key".to_string(),
            server.uri(),
            Duration::from_secs(2),
            RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(5)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_find_by_ingredients_sends_query_and_parses_stubs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/recipes/findByIngredients"))
            .and(query_param("ingredients", "chicken,rice"))
            .and(query_param("number", "5"))
            .and(query_param("apiKey", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "id": 101,
                    "title": "Chicken Fried Rice",
                    "usedIngredientCount": 2,
                    "missedIngredientCount": 1,
                    "usedIngredients": [{"name": "chicken"}, {"name": "rice"}],
                    "missedIngredients": [{"name": "soy sauce"}],
                    "likes": 12
                }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let query = IngredientQuery::new(vec!["chicken".into(), "rice".into()], 5);
        let stubs = provider(&server).find_by_ingredients(&query).await.unwrap();

        assert_eq!(stubs.len(), 1);
        assert_eq!(stubs[0].id, 101);
        assert_eq!(stubs[0].used_ingredient_count, 2);
    }

    #[tokio::test]
    async fn test_quota_exceeded_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/recipes/findByIngredients"))
            .respond_with(ResponseTemplate::new(402))
            .expect(1)
            .mount(&server)
            .await;

        let query = IngredientQuery::new(vec!["egg".into()], 10);
        let result = provider(&server).find_by_ingredients(&query).await;
        assert!(matches!(
            result,
            Err(ProviderError::QuotaExceeded { status: 402 })
        ));
    }

    #[tokio::test]
    async fn test_auth_failure_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/recipes/findByIngredients"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let query = IngredientQuery::new(vec!["egg".into()], 10);
        let result = provider(&server).find_by_ingredients(&query).await;
        assert!(matches!(result, Err(ProviderError::AuthFailure { .. })));
    }

    #[tokio::test]
    async fn test_server_error_is_retried_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/recipes/findByIngredients"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let query = IngredientQuery::new(vec!["egg".into()], 10);
        let result = provider(&server).find_by_ingredients(&query).await;
        assert!(matches!(
            result,
            Err(ProviderError::Upstream { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_timeout_is_retried_within_budget() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/recipes/findByIngredients"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(300)))
            .expect(3)
            .mount(&server)
            .await;

        let provider = SpoonacularProvider::new(
            "test-key".to_string(),
            server.uri(),
            Duration::from_millis(50),
            RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(5)),
        )
        .unwrap();

        let query = IngredientQuery::new(vec!["egg".into()], 10);
        let result = provider.find_by_ingredients(&query).await;
        assert!(matches!(result, Err(ProviderError::Unreachable(_))));
    }

    #[tokio::test]
    async fn test_get_details_parses_recipe() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/recipes/716429/information"))
            .and(query_param("includeNutrition", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 716429,
                "title": "Pasta with Garlic",
                "readyInMinutes": 45,
                "servings": 2,
                "extendedIngredients": [{"name": "pasta", "amount": 200, "unit": "g"}],
                "dishTypes": ["lunch", "main course"]
            })))
            .mount(&server)
            .await;

        let detail = provider(&server)
            .get_details(&ExternalId::Numeric(716429))
            .await
            .unwrap();
        assert_eq!(detail.id, 716429);
        assert_eq!(detail.ready_in_minutes, Some(45));
    }

    #[tokio::test]
    async fn test_get_details_not_found_names_recipe() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/recipes/5/information"))
            .respond_with(ResponseTemplate::new(404).set_body_string("gone"))
            .expect(1)
            .mount(&server)
            .await;

        let result = provider(&server).get_details(&ExternalId::Numeric(5)).await;
        match result {
            Err(ProviderError::NotFound(id)) => assert_eq!(id, "5"),
            other => panic!("expected NotFound, got {:?}", other.map(|d| d.id)),
        }
    }

    #[tokio::test]
    async fn test_text_ids_never_reach_provider() {
        let server = MockServer::start().await;
        let result = provider(&server)
            .get_details(&ExternalId::Text("custom-1".into()))
            .await;
        assert!(matches!(result, Err(ProviderError::NotFound(_))));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/recipes/findByIngredients"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let query = IngredientQuery::new(vec!["egg".into()], 10);
        let result = provider(&server).find_by_ingredients(&query).await;
        assert!(matches!(result, Err(ProviderError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_search_not_found_drops_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/recipes/findByIngredients"))
            .respond_with(ResponseTemplate::new(404).set_body_string("internal routing table"))
            .expect(1)
            .mount(&server)
            .await;

        let query = IngredientQuery::new(vec!["egg".into()], 10);
        let error = provider(&server)
            .find_by_ingredients(&query)
            .await
            .unwrap_err();
        assert!(!error.to_string().contains("routing"));
        assert!(!AppError::from(error).to_string().contains("routing"));
    }
}
