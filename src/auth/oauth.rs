//! GitHub OAuth flow
//!
//! Implements the OAuth 2.0 authorization code flow with GitHub.
//! Session states: anonymous, pending callback (`oauth_state` stored),
//! authenticated (`access_token` stored).

use axum::{
    Json, Router,
    extract::{Query, State},
    response::{IntoResponse, Redirect},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use super::middleware::MaybeProviderToken;
use super::session::{ACCESS_TOKEN_KEY, OAUTH_STATE_KEY, random_bytes};
use crate::AppState;
use crate::error::AppError;
use crate::metrics::OAUTH_CALLBACKS_TOTAL;

const STATE_TOKEN_BYTES: usize = 32;

/// Create authentication router
///
/// Routes:
/// - GET /login - Redirect to GitHub
/// - GET /callback - OAuth callback
/// - GET /check - Session authentication status
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/check", get(check_auth))
}

/// Generate a random CSRF state token (64 hex chars)
pub fn generate_state_token() -> Result<String, AppError> {
    Ok(hex::encode(random_bytes::<STATE_TOKEN_BYTES>()?))
}

// =============================================================================
// Login
// =============================================================================

/// GET /api/auth/login
///
/// # Steps
/// 1. Generate CSRF state token
/// 2. Store it in the session, creating one if needed
/// 3. Redirect to GitHub with client_id, redirect_uri, scope, state
async fn login(
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse, AppError> {
    let oauth_state = generate_state_token()?;

    state
        .sessions
        .put(&session, OAUTH_STATE_KEY, &oauth_state)
        .await?;

    let authorize_url = state.oauth.authorize_url(&oauth_state);
    tracing::debug!(new_session = session.id().is_none(), "Redirecting to authorization server");

    Ok(Redirect::temporary(authorize_url.as_str()))
}

// =============================================================================
// Callback
// =============================================================================

/// Query parameters from GitHub callback
#[derive(Debug, Deserialize)]
struct CallbackQuery {
    /// Authorization code
    code: Option<String>,
    /// CSRF state token
    state: Option<String>,
    /// Set when the user denied access
    error: Option<String>,
}

/// GET /api/auth/callback
///
/// # Steps
/// 1. Take the stored state (it is consumed whatever happens next)
/// 2. Verify it matches the `state` parameter
/// 3. Exchange code for access token
/// 4. Move the session to a new ID, store the token and redirect to
///    the frontend profile page
async fn callback(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> Result<impl IntoResponse, AppError> {
    let stored_state = state.sessions.take(&session, OAUTH_STATE_KEY).await?;

    let state_matches = matches!(
        (stored_state.as_deref(), query.state.as_deref()),
        (Some(stored), Some(received)) if stored == received
    );
    if !state_matches {
        tracing::warn!(
            stored_state_present = stored_state.is_some(),
            query_state_present = query.state.is_some(),
            "OAuth callback rejected: state mismatch"
        );
        record_callback("invalid_state");
        return Err(AppError::InvalidState);
    }

    if let Some(error) = query.error {
        tracing::info!(provider_error = %error, "Authorization denied by provider");
        record_callback("denied");
        return Err(AppError::Validation(
            "Authorization was denied".to_string(),
        ));
    }

    let Some(code) = query.code.filter(|code| !code.is_empty()) else {
        record_callback("missing_code");
        return Err(AppError::Validation(
            "Missing authorization code".to_string(),
        ));
    };

    let access_token = match state.oauth.exchange_code(&code).await {
        Ok(token) => token,
        Err(error) => {
            record_callback("exchange_failed");
            return Err(error);
        }
    };

    state.sessions.renew(&session).await?;
    state
        .sessions
        .put(&session, ACCESS_TOKEN_KEY, &access_token)
        .await?;
    record_callback("authenticated");
    tracing::info!("OAuth login completed");

    Ok(Redirect::temporary(
        &state.config.server.post_login_redirect(),
    ))
}

fn record_callback(outcome: &str) {
    OAUTH_CALLBACKS_TOTAL.with_label_values(&[outcome]).inc();
}

// =============================================================================
// Check
// =============================================================================

#[derive(Debug, Serialize)]
struct AuthStatus {
    authenticated: bool,
}

/// GET /api/auth/check
async fn check_auth(MaybeProviderToken(token): MaybeProviderToken) -> Json<AuthStatus> {
    Json(AuthStatus {
        authenticated: token.is_some(),
    })
}
