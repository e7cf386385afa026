//! github-oauth-backend - Session-backed GitHub login for a web frontend
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - /api/auth: login, callback, check                        │
//! │  - /api/user: profile                                       │
//! │  - /health, /metrics                                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Auth / Service Layer                         │
//! │  - OAuth 2.0 authorization code flow (oauth2)               │
//! │  - GitHub REST API client (reqwest)                         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - PostgreSQL session store (tower-sessions, sqlx)          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers for the user API and metrics
//! - `auth`: GitHub OAuth flow, sessions, extractors
//! - `service`: GitHub REST API client
//! - `data`: PostgreSQL bootstrap and session stores
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod service;

#[cfg(test)]
mod test_utils;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// Cloned for each request; every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Cookie-identified server-side sessions
    pub sessions: Arc<auth::SessionManager>,

    /// OAuth authorization server (GitHub)
    pub oauth: Arc<dyn auth::AuthorizationServer>,

    /// Profile source (GitHub REST API)
    pub profiles: Arc<dyn service::ProfileProvider>,
}

impl AppState {
    /// Initialize application state
    ///
    /// Builds the GitHub OAuth and API clients. The session store is
    /// created separately and handed to [`build_router`].
    ///
    /// # Errors
    /// Returns error if a client cannot be built from the configuration
    pub fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let oauth = Arc::new(auth::GitHubOAuth::new(&config.oauth)?);
        let profiles = Arc::new(service::GitHubClient::new(&config.github)?);
        tracing::info!(
            scopes = ?config.oauth.scopes,
            api_base_url = %config.github.api_base_url,
            "GitHub clients initialized"
        );

        Ok(Self::from_parts(config, oauth, profiles))
    }

    /// Assemble state from already-built components
    pub fn from_parts(
        config: config::AppConfig,
        oauth: Arc<dyn auth::AuthorizationServer>,
        profiles: Arc<dyn service::ProfileProvider>,
    ) -> Self {
        let sessions = Arc::new(auth::SessionManager::new(config.session.clone()));

        Self {
            config: Arc::new(config),
            sessions,
            oauth,
            profiles,
        }
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments. Sessions are kept in
/// `store`.
pub fn build_router<Store>(state: AppState, store: Store) -> axum::Router
where
    Store: tower_sessions::SessionStore + Clone,
{
    use axum::Router;
    use tower_http::catch_panic::CatchPanicLayer;
    use tower_http::trace::TraceLayer;

    let metrics_enabled = state.config.server.metrics_enabled;
    let cors_layer = build_cors_layer(&state.config.server);
    let session_layer = state.sessions.layer(store);

    let mut router = Router::new()
        .route("/health", axum::routing::get(health_check))
        .nest("/api/auth", auth::auth_router())
        .nest("/api/user", api::user_router())
        .layer(session_layer);

    if let Some(cors_layer) = cors_layer {
        router = router.layer(cors_layer);
    }

    let router = router
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if metrics_enabled {
        router.merge(api::metrics_router())
    } else {
        router
    }
}

/// Turn a handler panic into the generic 500 response
fn handle_panic(panic: Box<dyn std::any::Any + Send + 'static>) -> axum::response::Response {
    use axum::response::IntoResponse;

    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    error::AppError::Internal(anyhow::anyhow!("handler panicked: {detail}")).into_response()
}

/// CORS for the frontend origin
///
/// Installed only when `server.environment` is development.
fn build_cors_layer(server: &config::ServerConfig) -> Option<tower_http::cors::CorsLayer> {
    use axum::http::{HeaderValue, Method, header};
    use std::time::Duration;
    use tower_http::cors::{AllowOrigin, CorsLayer};

    if server.environment != config::DeploymentEnvironment::Development {
        return None;
    }

    let allowed_origin = server.frontend_origin();
    match HeaderValue::from_str(allowed_origin) {
        Ok(origin) => Some(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list([origin]))
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    header::ORIGIN,
                    header::CONTENT_TYPE,
                    header::ACCEPT,
                    header::AUTHORIZATION,
                ])
                .allow_credentials(true)
                .max_age(Duration::from_secs(300)),
        ),
        Err(error) => {
            tracing::error!(
                %error,
                origin = %allowed_origin,
                "Failed to parse CORS origin from frontend URL; denying cross-origin requests"
            );
            None
        }
    }
}

async fn health_check() -> axum::Json<api::HealthResponse> {
    axum::Json(api::HealthResponse { status: "ok" })
}
