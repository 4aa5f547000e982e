use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::auth::repo_types::User;
use crate::auth::services::JwtKeys;
use crate::error::ApiError;
use crate::recipes::repo_types::Owner;
use crate::state::AppState;

/// Identity resolved by [`require_auth`] for the current request.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn owner(&self) -> Owner {
        Owner::of(&self.0)
    }
}

/// Pulls the token out of `Authorization: Bearer <t>` (or `Token <t>`).
fn bearer_token(headers: &axum::http::HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthenticated("missing Authorization header".into()))?;

    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .or_else(|| value.strip_prefix("Token "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthenticated("invalid auth scheme".into()))
}

/// Resolves the caller from the bearer token and makes it available to
/// handlers as [`AuthUser`]. Requests without a valid token for an active
/// user stop here with 401.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())?;

    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify(token).map_err(|e| {
        warn!(error = %e, "invalid or expired token");
        ApiError::Unauthenticated("invalid or expired token".into())
    })?;

    let user = state
        .store
        .find_user_by_id(claims.sub)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| {
            warn!(user_id = claims.sub, "token for missing or inactive user");
            ApiError::Unauthenticated("user inactive or deleted".into())
        })?;

    request.extensions_mut().insert(AuthUser(user));
    Ok(next.run(request).await)
}

/// Layered inside [`require_auth`]; lets only staff accounts through.
pub async fn require_staff(request: Request, next: Next) -> Result<Response, ApiError> {
    let is_staff = request
        .extensions()
        .get::<AuthUser>()
        .map(|AuthUser(u)| u.is_staff)
        .ok_or_else(|| ApiError::Unauthenticated("no identity resolved".into()))?;
    if !is_staff {
        return Err(ApiError::Forbidden);
    }
    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthenticated("route is not behind require_auth".into()))
    }
}
