//! GitHub REST API client
//!
//! Fetches the authenticated user's profile live on every request.
//! Nothing from the response is persisted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::config::GitHubApiConfig;
use crate::error::AppError;
use crate::metrics::PROVIDER_REQUESTS_TOTAL;

const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";
const MAX_LOGGED_BODY_CHARS: usize = 512;

/// GitHub user info from `GET /user`.
///
/// Only `id` and `login` are required; GitHub omits or nulls the rest
/// depending on the account's visibility settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GitHubUser {
    pub id: u64,
    pub login: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub blog: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Source of user profiles for an access token
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileProvider: Send + Sync {
    async fn fetch_profile(&self, access_token: &str) -> Result<GitHubUser, AppError>;
}

/// HTTP client for the GitHub REST API
pub struct GitHubClient {
    http: reqwest::Client,
    user_url: Url,
}

impl GitHubClient {
    pub fn new(config: &GitHubApiConfig) -> Result<Self, AppError> {
        let user_url = format!("{}/user", config.api_base_url.trim_end_matches('/'));
        let user_url = Url::parse(&user_url)
            .map_err(|e| AppError::Config(format!("github.api_base_url: {e}")))?;

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, user_url })
    }
}

#[async_trait]
impl ProfileProvider for GitHubClient {
    async fn fetch_profile(&self, access_token: &str) -> Result<GitHubUser, AppError> {
        let response = self
            .http
            .get(self.user_url.clone())
            .bearer_auth(access_token)
            .header(ACCEPT, GITHUB_MEDIA_TYPE)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .send()
            .await
            .map_err(|e| {
                record_request("transport_error");
                AppError::Provider(format!("request to {} failed: {e}", self.user_url))
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_LOGGED_BODY_CHARS).collect();
            record_request("http_error");
            return Err(AppError::Provider(format!(
                "GitHub API returned status {status}: {body}"
            )));
        }

        let user = response.json::<GitHubUser>().await.map_err(|e| {
            record_request("decode_error");
            AppError::Provider(format!("failed to decode GitHub user: {e}"))
        })?;

        record_request("ok");
        tracing::debug!(github_id = user.id, login = %user.login, "Fetched GitHub profile");
        Ok(user)
    }
}

fn record_request(outcome: &str) {
    PROVIDER_REQUESTS_TOTAL
        .with_label_values(&["fetch_profile", outcome])
        .inc();
}
