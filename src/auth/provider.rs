//! GitHub OAuth 2.0 client
//!
//! Builds the authorization URL and exchanges authorization codes for
//! access tokens. State handling lives with the HTTP handlers; this
//! module only talks to the provider.

use async_trait::async_trait;
use oauth2::basic::BasicClient;
use oauth2::{
    AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet,
    EndpointSet, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use std::time::Duration;
use url::Url;

use crate::config::OAuthConfig;
use crate::error::AppError;
use crate::metrics::PROVIDER_REQUESTS_TOTAL;

const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// OAuth client type with auth URL and token URL set.
type ConfiguredClient = oauth2::Client<
    oauth2::basic::BasicErrorResponse,
    oauth2::basic::BasicTokenResponse,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::basic::BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

/// Authorization server operations used by the login flow
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthorizationServer: Send + Sync {
    /// Provider consent URL carrying `state`
    fn authorize_url(&self, state: &str) -> Url;

    /// Exchange an authorization code for an access token
    async fn exchange_code(&self, code: &str) -> Result<String, AppError>;
}

/// GitHub OAuth handler.
pub struct GitHubOAuth {
    client: ConfiguredClient,
    http: reqwest::Client,
    scopes: Vec<Scope>,
}

impl GitHubOAuth {
    pub fn new(config: &OAuthConfig) -> Result<Self, AppError> {
        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_uri(
                AuthUrl::new(config.authorize_url.clone())
                    .map_err(|e| AppError::Config(format!("oauth.authorize_url: {e}")))?,
            )
            .set_token_uri(
                TokenUrl::new(config.token_url.clone())
                    .map_err(|e| AppError::Config(format!("oauth.token_url: {e}")))?,
            )
            .set_redirect_uri(
                RedirectUrl::new(config.redirect_url.clone())
                    .map_err(|e| AppError::Config(format!("oauth.redirect_url: {e}")))?,
            )
            .set_auth_type(AuthType::RequestBody);

        // Token endpoint redirects are never followed.
        let http = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(TOKEN_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to build HTTP client: {e}")))?;

        let scopes = config.scopes.iter().cloned().map(Scope::new).collect();

        Ok(Self {
            client,
            http,
            scopes,
        })
    }
}

#[async_trait]
impl AuthorizationServer for GitHubOAuth {
    fn authorize_url(&self, state: &str) -> Url {
        let state = state.to_string();
        let (url, _) = self
            .client
            .authorize_url(move || CsrfToken::new(state))
            .add_scopes(self.scopes.iter().cloned())
            .url();
        url
    }

    async fn exchange_code(&self, code: &str) -> Result<String, AppError> {
        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| {
                PROVIDER_REQUESTS_TOTAL
                    .with_label_values(&["token_exchange", "error"])
                    .inc();
                AppError::TokenExchange(e.to_string())
            })?;

        PROVIDER_REQUESTS_TOTAL
            .with_label_values(&["token_exchange", "ok"])
            .inc();
        Ok(token.access_token().secret().clone())
    }
}
