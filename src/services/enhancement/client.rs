use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::{
        enhancement::{
            AnalyzeResponse, CookingTipsResponse, EnhanceRequest, EnhanceResponse,
            ShoppingListRequest, ShoppingListResponse, TrainRequest,
        },
        RecipePayload,
    },
};

const API_KEY_HEADER: &str = "X-API-Key";

#[derive(thiserror::Error, Debug)]
pub enum EnhancementError {
    #[error("Enhancement service timed out: {0}")]
    Timeout(String),

    #[error("Enhancement service unreachable: {0}")]
    Unreachable(String),

    #[error("Enhancement service returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid enhancement response: {0}")]
    InvalidResponse(String),

    #[error("Enhancement is not configured")]
    Disabled,
}

impl EnhancementError {
    /// Timeouts, connection failures, 429 and 5xx may succeed on a later attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            EnhancementError::Timeout(_) | EnhancementError::Unreachable(_) => true,
            EnhancementError::Status { status, .. } => *status == 429 || *status >= 500,
            EnhancementError::InvalidResponse(_) | EnhancementError::Disabled => false,
        }
    }
}

impl From<reqwest::Error> for EnhancementError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            EnhancementError::Timeout(e.to_string())
        } else if e.is_decode() {
            EnhancementError::InvalidResponse(e.to_string())
        } else {
            EnhancementError::Unreachable(e.to_string())
        }
    }
}

/// Client for the AI enhancement service
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait EnhancementClient: Send + Sync {
    async fn enhance_recipes(
        &self,
        request: &EnhanceRequest,
    ) -> Result<EnhanceResponse, EnhancementError>;

    async fn analyze_ingredients(
        &self,
        ingredients: &[String],
    ) -> Result<AnalyzeResponse, EnhancementError>;

    async fn cooking_tips(
        &self,
        recipe: &RecipePayload,
    ) -> Result<CookingTipsResponse, EnhancementError>;

    async fn shopping_list(
        &self,
        request: &ShoppingListRequest,
    ) -> Result<ShoppingListResponse, EnhancementError>;

    async fn train(&self, request: &TrainRequest) -> Result<(), EnhancementError>;
}

/// HTTP client for the enhancement service
#[derive(Clone)]
pub struct HttpEnhancementClient {
    http_client: HttpClient,
    api_url: String,
    api_key: Option<String>,
}

impl HttpEnhancementClient {
    pub fn new(api_url: String, api_key: Option<String>, timeout: Duration) -> AppResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, EnhancementError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.api_url, path);
        let mut request = self.http_client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EnhancementError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| EnhancementError::InvalidResponse(e.to_string()))
    }
}

#[async_trait::async_trait]
impl EnhancementClient for HttpEnhancementClient {
    async fn enhance_recipes(
        &self,
        request: &EnhanceRequest,
    ) -> Result<EnhanceResponse, EnhancementError> {
        self.post_json("/enhance-recipes", request).await
    }

    async fn analyze_ingredients(
        &self,
        ingredients: &[String],
    ) -> Result<AnalyzeResponse, EnhancementError> {
        self.post_json(
            "/analyze-ingredients",
            &serde_json::json!({ "ingredients": ingredients }),
        )
        .await
    }

    async fn cooking_tips(
        &self,
        recipe: &RecipePayload,
    ) -> Result<CookingTipsResponse, EnhancementError> {
        self.post_json("/cooking-tips", &serde_json::json!({ "recipe": recipe }))
            .await
    }

    async fn shopping_list(
        &self,
        request: &ShoppingListRequest,
    ) -> Result<ShoppingListResponse, EnhancementError> {
        self.post_json("/shopping-list", request).await
    }

    async fn train(&self, request: &TrainRequest) -> Result<(), EnhancementError> {
        let _: serde_json::Value = self.post_json("/train", request).await?;
        Ok(())
    }
}

/// Stand-in used when no enhancement service is configured
#[derive(Clone, Copy, Default)]
pub struct DisabledEnhancementClient;

#[async_trait::async_trait]
impl EnhancementClient for DisabledEnhancementClient {
    async fn enhance_recipes(&self, _: &EnhanceRequest) -> Result<EnhanceResponse, EnhancementError> {
        Err(EnhancementError::Disabled)
    }

    async fn analyze_ingredients(&self, _: &[String]) -> Result<AnalyzeResponse, EnhancementError> {
        Err(EnhancementError::Disabled)
    }

    async fn cooking_tips(&self, _: &RecipePayload) -> Result<CookingTipsResponse, EnhancementError> {
        Err(EnhancementError::Disabled)
    }

    async fn shopping_list(
        &self,
        _: &ShoppingListRequest,
    ) -> Result<ShoppingListResponse, EnhancementError> {
        Err(EnhancementError::Disabled)
    }

    async fn train(&self, _: &TrainRequest) -> Result<(), EnhancementError> {
        Err(EnhancementError::Disabled)
    }
}
