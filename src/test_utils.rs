//! Shared fixtures for unit tests

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::response::Response;
use tower_sessions::Session;

use crate::AppState;
use crate::auth::AuthorizationServer;
use crate::config::{
    AppConfig, DatabaseConfig, DeploymentEnvironment, GitHubApiConfig, LoggingConfig,
    OAuthConfig, SameSitePolicy, ServerConfig, SessionConfig,
};
use crate::data::MemoryStore;
use crate::service::ProfileProvider;

pub fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: DeploymentEnvironment::Development,
            frontend_url: "http://frontend.test".to_string(),
            metrics_enabled: false,
        },
        database: DatabaseConfig {
            host: "127.0.0.1".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            name: "github_oauth_app".to_string(),
            sslmode: "disable".to_string(),
            max_connections: 1,
            connect_retries: 1,
            connect_retry_delay_seconds: 0,
            migrations_dir: PathBuf::from("migrations"),
        },
        oauth: OAuthConfig {
            client_id: "test-client-id".to_string(),
            client_secret: "test-client-secret".to_string(),
            redirect_url: "http://backend.test/api/auth/callback".to_string(),
            authorize_url: "http://provider.test/login/oauth/authorize".to_string(),
            token_url: "http://provider.test/login/oauth/access_token".to_string(),
            scopes: vec!["read:user".to_string(), "user:email".to_string()],
        },
        github: GitHubApiConfig {
            api_base_url: "http://provider.test".to_string(),
            timeout_seconds: 5,
            user_agent: "github-oauth-backend-tests".to_string(),
        },
        session: SessionConfig {
            cookie_name: "session_id".to_string(),
            cookie_domain: None,
            cookie_secure: false,
            cookie_same_site: SameSitePolicy::Lax,
            lifetime_seconds: 3600,
            cleanup_interval_seconds: 1800,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
    }
}

/// State with the given provider doubles, plus an empty session store
pub fn test_state(
    oauth: impl AuthorizationServer + 'static,
    profiles: impl ProfileProvider + 'static,
) -> (AppState, MemoryStore) {
    let state = AppState::from_parts(test_config(), Arc::new(oauth), Arc::new(profiles));
    (state, MemoryStore::default())
}

/// `router` behind the session layer over `store`
pub fn test_app(router: Router<AppState>, state: &AppState, store: &MemoryStore) -> Router {
    router
        .layer(state.sessions.layer(store.clone()))
        .with_state(state.clone())
}

/// Start a session holding `key = value`, returning its `Cookie` header value
pub async fn session_cookie(
    state: &AppState,
    store: &MemoryStore,
    key: &str,
    value: &str,
) -> String {
    let session = Session::new(None, Arc::new(store.clone()), None);
    state.sessions.put(&session, key, value).await.unwrap();
    session.save().await.unwrap();
    format!(
        "{}={}",
        state.config.session.cookie_name,
        session.id().unwrap()
    )
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
