use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};

use crate::auth::tokens::{Claims, TokenKind};
use crate::errors::AppError;
use crate::models::user::UserRow;
use crate::state::AppState;

/// Authenticated user extracted from the `Authorization: Bearer` header.
/// Use as a handler parameter to require a valid access token.
pub struct AuthUser {
    pub user: UserRow,
    pub claims: Claims,
}

/// The raw token from `Authorization: Bearer <token>`, if present.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(AppError::Unauthorized)?;

        let app_state = AppState::from_ref(state);
        let claims = app_state
            .tokens
            .decode(token, TokenKind::Access)
            .map_err(|_| AppError::Unauthorized)?;

        let user = app_state
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !user.is_active || !claims.matches_password(&user) {
            tracing::debug!(user_id = %user.id, "access token refused for inactive user or stale password");
            return Err(AppError::Unauthorized);
        }

        Ok(Self { user, claims })
    }
}
