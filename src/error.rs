use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    /// Provider quota or payment failure
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Provider rejected our credentials
    #[error("Service misconfigured: {0}")]
    ServiceConfiguration(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("At least {required} recipes are required to generate a meal plan, found {available}")]
    InsufficientCandidates { required: usize, available: usize },

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::InsufficientCandidates { .. } => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::RateLimited(msg) => (StatusCode::TOO_MANY_REQUESTS, msg),
            AppError::ServiceConfiguration(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Recipe service is not configured correctly".to_string(),
            ),
            AppError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Database(_) | AppError::Cache(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_candidates_message_names_counts() {
        let err = AppError::InsufficientCandidates {
            required: 7,
            available: 3,
        };
        assert_eq!(
            err.to_string(),
            "At least 7 recipes are required to generate a meal plan, found 3"
        );
    }

    #[test]
    fn test_status_codes() {
        let cases = vec![
            (AppError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::RateLimited("q".into()), StatusCode::TOO_MANY_REQUESTS),
            (
                AppError::ServiceConfiguration("key".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (AppError::Upstream("5xx".into()), StatusCode::BAD_GATEWAY),
            (
                AppError::InsufficientCandidates {
                    required: 7,
                    available: 0,
                },
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
