/// External recipe data provider abstraction
///
/// The provider is the source of truth for recipe content. Everything it returns flows
/// through the recipe cache store, which persists details so repeated lookups stay local.
use crate::{
    error::AppError,
    models::{ExternalId, IngredientQuery, RecipeDetail, RecipeStub},
};

pub mod spoonacular;

pub use spoonacular::SpoonacularProvider;

/// Failure taxonomy for provider calls
///
/// Each variant maps to a distinct status for clients, see the `From` impl below.
#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    /// Payment required or rate limited
    #[error("Recipe provider quota exceeded (status {status})")]
    QuotaExceeded { status: u16 },

    /// Credentials rejected; an operator has to fix this
    #[error("Recipe provider rejected credentials (status {status})")]
    AuthFailure { status: u16 },

    /// Timeout or connection failure
    #[error("Recipe provider unreachable: {0}")]
    Unreachable(String),

    #[error("Recipe provider error (status {status}): {message}")]
    Upstream { status: u16, message: String },

    /// Holds the recipe id when the caller knows it, else an empty string
    #[error("Recipe not found at provider: {0}")]
    NotFound(String),

    /// Any other 4xx
    #[error("Recipe provider rejected request (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Classifies a non-success HTTP status
    ///
    /// A 404 body is never kept; callers that know the recipe id attach it themselves.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            402 | 429 => ProviderError::QuotaExceeded { status },
            401 | 403 => ProviderError::AuthFailure { status },
            404 => ProviderError::NotFound(String::new()),
            500..=599 => ProviderError::Upstream {
                status,
                message: body,
            },
            _ => ProviderError::Rejected {
                status,
                message: body,
            },
        }
    }

    /// Whether another attempt may succeed, given the retries already spent
    ///
    /// Network failures use the whole retry budget; upstream 5xx get a single retry.
    pub fn is_retryable(&self, retries_so_far: u32) -> bool {
        match self {
            ProviderError::Unreachable(_) => true,
            ProviderError::Upstream { .. } => retries_so_far == 0,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ProviderError::InvalidResponse(e.to_string())
        } else {
            ProviderError::Unreachable(e.to_string())
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::QuotaExceeded { .. } => AppError::RateLimited(
                "Recipe provider quota exceeded, try again later".to_string(),
            ),
            ProviderError::AuthFailure { .. } => AppError::ServiceConfiguration(e.to_string()),
            ProviderError::Unreachable(_) => AppError::ServiceUnavailable(
                "Recipe provider is temporarily unavailable".to_string(),
            ),
            ProviderError::NotFound(id) if id.is_empty() => {
                AppError::NotFound("Recipe not found".to_string())
            }
            ProviderError::NotFound(id) => AppError::NotFound(format!("Recipe {} not found", id)),
            ProviderError::Upstream { .. }
            | ProviderError::Rejected { .. }
            | ProviderError::InvalidResponse(_) => AppError::Upstream(e.to_string()),
        }
    }
}

/// Trait for recipe data providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RecipeProvider: Send + Sync {
    /// Recipes that use the given ingredients, as lightweight stubs
    async fn find_by_ingredients(
        &self,
        query: &IngredientQuery,
    ) -> Result<Vec<RecipeStub>, ProviderError>;

    /// Full recipe details including nutrition
    async fn get_details(&self, id: &ExternalId) -> Result<RecipeDetail, ProviderError>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
