use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::AppError;

/// HTTP header carrying the caller's user id
pub const USER_ID_HEADER: &str = "x-user-id";

fn parse_user_id(parts: &Parts) -> Result<Option<Uuid>, AppError> {
    let Some(value) = parts.headers.get(USER_ID_HEADER) else {
        return Ok(None);
    };

    value
        .to_str()
        .ok()
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
        .map(Some)
        .ok_or_else(|| AppError::Validation(format!("{} must be a UUID", USER_ID_HEADER)))
}

/// Caller identity, required
#[derive(Debug, Clone, Copy)]
pub struct UserId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parse_user_id(parts)?
            .map(UserId)
            .ok_or_else(|| AppError::Validation(format!("{} header is required", USER_ID_HEADER)))
    }
}

/// Caller identity when present; a malformed header is still rejected
#[derive(Debug, Clone, Copy)]
pub struct MaybeUserId(pub Option<Uuid>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUserId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parse_user_id(parts).map(MaybeUserId)
    }
}
