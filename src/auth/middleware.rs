//! Authentication extractors
//!
//! Resolve the provider access token from the request's session.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tower_sessions::Session;

use super::session::ACCESS_TOKEN_KEY;
use crate::AppState;
use crate::error::AppError;

async fn session_access_token<S>(parts: &mut Parts, state: &S) -> Result<Option<String>, AppError>
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    let session = Session::from_request_parts(parts, state)
        .await
        .map_err(|(_, reason)| AppError::Session(reason.to_string()))?;
    let app_state = AppState::from_ref(state);

    Ok(app_state
        .sessions
        .get(&session, ACCESS_TOKEN_KEY)
        .await?
        .filter(|token| !token.is_empty()))
}

/// Extractor for the access token of an authenticated session
///
/// Rejects with 401 when the session holds no token.
///
/// # Usage
/// ```ignore
/// async fn handler(ProviderToken(token): ProviderToken) -> impl IntoResponse {
///     // call the provider API with `token`
/// }
/// ```
#[derive(Clone)]
pub struct ProviderToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for ProviderToken
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        session_access_token(parts, state)
            .await?
            .map(ProviderToken)
            .ok_or(AppError::Unauthorized)
    }
}

/// Optional access token extractor
///
/// Yields `None` for anonymous requests instead of rejecting.
#[derive(Clone)]
pub struct MaybeProviderToken(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeProviderToken
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeProviderToken(session_access_token(parts, state).await?))
    }
}
