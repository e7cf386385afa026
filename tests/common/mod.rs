//! Common test utilities for E2E tests
//!
//! Each test gets its own server on a random port, an in-memory session
//! store, and a wiremock server standing in for both the GitHub OAuth
//! endpoints and the GitHub REST API.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use github_oauth_backend::data::MemoryStore;
use github_oauth_backend::service::ProfileProvider;
use github_oauth_backend::{AppState, auth, config};
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const AUTHORIZE_PATH: &str = "/login/oauth/authorize";
pub const TOKEN_PATH: &str = "/login/oauth/access_token";
pub const FRONTEND_URL: &str = "http://frontend.test";
pub const ACCESS_TOKEN: &str = "gho_test_token";

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub store: MemoryStore,
    pub client: reqwest::Client,
}

/// A login that has been started but not called back yet
pub struct PendingLogin {
    /// `Cookie` header value carrying the session ID
    pub cookie: String,
    /// State parameter sent to the provider
    pub state: String,
}

pub fn test_config(provider_uri: &str) -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Let OS assign port
            environment: config::DeploymentEnvironment::Development,
            frontend_url: FRONTEND_URL.to_string(),
            metrics_enabled: false,
        },
        database: config::DatabaseConfig {
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
        oauth: config::OAuthConfig {
            client_id: "test-client-id".to_string(),
            client_secret: "test-client-secret".to_string(),
            redirect_url: "http://backend.test/api/auth/callback".to_string(),
            authorize_url: format!("{provider_uri}{AUTHORIZE_PATH}"),
            token_url: format!("{provider_uri}{TOKEN_PATH}"),
            scopes: vec!["read:user".to_string(), "user:email".to_string()],
        },
        github: config::GitHubApiConfig {
            api_base_url: provider_uri.to_string(),
            timeout_seconds: 5,
            user_agent: "github-oauth-backend-tests".to_string(),
        },
        session: config::SessionConfig {
            cookie_name: "session_id".to_string(),
            cookie_domain: None,
            cookie_secure: false,
            cookie_same_site: config::SameSitePolicy::Lax,
            lifetime_seconds: 31_536_000,
            cleanup_interval_seconds: 1800,
        },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

impl TestServer {
    /// Create a new test server instance against `provider`
    pub async fn start(provider: &MockServer) -> Self {
        Self::start_with(provider, |_| {}).await
    }

    /// Like [`TestServer::start`], with a hook to adjust the configuration
    pub async fn start_with(
        provider: &MockServer,
        customize: impl FnOnce(&mut config::AppConfig),
    ) -> Self {
        let mut config = test_config(&provider.uri());
        customize(&mut config);

        Self::serve(AppState::new(config).unwrap()).await
    }

    /// Like [`TestServer::start`], with `profiles` in place of the GitHub API client
    pub async fn start_with_profiles(
        provider: &MockServer,
        profiles: Arc<dyn ProfileProvider>,
    ) -> Self {
        let config = test_config(&provider.uri());
        let oauth = Arc::new(auth::GitHubOAuth::new(&config.oauth).unwrap());

        Self::serve(AppState::from_parts(config, oauth, profiles)).await
    }

    async fn serve(state: AppState) -> Self {
        github_oauth_backend::metrics::init_metrics();
        let store = MemoryStore::default();

        // Redirects must stay observable
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = github_oauth_backend::build_router(state.clone(), store.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            store,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str, cookie: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(self.url(path));
        if let Some(cookie) = cookie {
            request = request.header("cookie", cookie);
        }
        request.send().await.expect("request succeeds")
    }

    /// Start a login and capture the session cookie and state
    pub async fn login(&self) -> PendingLogin {
        let response = self.get("/api/auth/login", None).await;
        assert_eq!(response.status(), 307);

        let cookie = session_cookie(&response).expect("login sets session cookie");
        let state = location(&response)
            .query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned())
            .expect("authorize URL carries state");

        PendingLogin { cookie, state }
    }

    pub async fn callback(&self, cookie: Option<&str>, query: &str) -> reqwest::Response {
        self.get(&format!("/api/auth/callback?{query}"), cookie)
            .await
    }

    /// Run login and callback against a token endpoint returning [`ACCESS_TOKEN`]
    ///
    /// Returns the cookie of the authenticated session.
    pub async fn authenticate(&self, provider: &MockServer) -> String {
        mount_token_endpoint(provider).await;

        let login = self.login().await;
        let response = self
            .callback(
                Some(&login.cookie),
                &format!("code=good-code&state={}", login.state),
            )
            .await;
        assert_eq!(response.status(), 307);

        session_cookie(&response).expect("callback sets session cookie")
    }

    pub async fn is_authenticated(&self, cookie: Option<&str>) -> bool {
        let response = self.get("/api/auth/check", cookie).await;
        assert_eq!(response.status(), 200);
        let body: serde_json::Value = response.json().await.unwrap();
        body["authenticated"].as_bool().expect("authenticated is a bool")
    }
}

/// Token endpoint stub issuing [`ACCESS_TOKEN`]
pub async fn mount_token_endpoint(provider: &MockServer) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": ACCESS_TOKEN,
            "token_type": "bearer",
            "scope": "read:user,user:email"
        })))
        .mount(provider)
        .await;
}

/// Number of requests the provider stub received on `request_path`
pub async fn request_count(provider: &MockServer, request_path: &str) -> usize {
    provider
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == request_path)
        .count()
}

/// `Max-Age` of the session cookie set by `response`
pub fn cookie_max_age(response: &reqwest::Response) -> Option<i64> {
    set_cookie_header(response)?
        .split(';')
        .map(str::trim)
        .find_map(|attribute| attribute.strip_prefix("Max-Age="))
        .and_then(|value| value.parse().ok())
}

/// `name=value` of the session cookie set by `response`
pub fn session_cookie(response: &reqwest::Response) -> Option<String> {
    set_cookie_header(response).map(|header| {
        header
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string()
    })
}

pub fn set_cookie_header(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("session_id="))
        .map(ToOwned::to_owned)
}

pub fn location(response: &reqwest::Response) -> url::Url {
    let location = response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header");
    url::Url::parse(location).expect("absolute location")
}
