//! Cookie-identified server-side sessions
//!
//! The browser only ever holds the opaque session ID issued by
//! `tower-sessions`. Everything else (the OAuth state, the provider
//! access token) lives in the session store.
//!
//! Sessions expire a fixed lifetime after their first write, however
//! often they are written afterwards.

use rand::RngCore;
use rand::rngs::OsRng;
use time::OffsetDateTime;
use tower_sessions::cookie::SameSite;
use tower_sessions::{Expiry, Session, SessionManagerLayer, SessionStore};

use crate::config::{SameSitePolicy, SessionConfig};
use crate::error::AppError;

/// Session key holding the provider access token
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Session key holding the pending OAuth state token
pub const OAUTH_STATE_KEY: &str = "oauth_state";
/// Unix timestamp of the first write, anchors the absolute expiry
const STARTED_AT_KEY: &str = "started_at";

/// Fill `N` bytes from the operating system RNG
pub(crate) fn random_bytes<const N: usize>() -> Result<[u8; N], AppError> {
    let mut bytes = [0u8; N];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| AppError::Randomness(e.to_string()))?;
    Ok(bytes)
}

impl From<SameSitePolicy> for SameSite {
    fn from(policy: SameSitePolicy) -> Self {
        match policy {
            SameSitePolicy::Strict => SameSite::Strict,
            SameSitePolicy::Lax => SameSite::Lax,
            SameSitePolicy::None => SameSite::None,
        }
    }
}

/// Session access for handlers and extractors
pub struct SessionManager {
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Session middleware over `store` with the configured cookie attributes
    pub fn layer<Store>(&self, store: Store) -> SessionManagerLayer<Store>
    where
        Store: SessionStore + Clone,
    {
        let layer = SessionManagerLayer::new(store)
            .with_name(self.config.cookie_name.clone())
            .with_path("/")
            .with_http_only(true)
            .with_secure(self.config.cookie_secure)
            .with_same_site(self.config.cookie_same_site.into());

        match self
            .config
            .cookie_domain
            .as_ref()
            .filter(|domain| !domain.is_empty())
        {
            Some(domain) => layer.with_domain(domain.clone()),
            None => layer,
        }
    }

    pub async fn get(&self, session: &Session, key: &str) -> Result<Option<String>, AppError> {
        Ok(session.get::<String>(key).await?)
    }

    /// Store `value` under `key`
    ///
    /// The first write starts the session clock; the store record and the
    /// cookie both expire `lifetime_seconds` after it.
    pub async fn put(&self, session: &Session, key: &str, value: &str) -> Result<(), AppError> {
        let started_at = session.get::<i64>(STARTED_AT_KEY).await?;
        let start = started_at.unwrap_or_else(|| OffsetDateTime::now_utc().unix_timestamp());
        let expires_at = self.expires_at(start)?;

        if started_at.is_none() {
            session.insert(STARTED_AT_KEY, start).await?;
        }
        session.set_expiry(Some(Expiry::AtDateTime(expires_at)));
        session.insert(key, value).await?;
        Ok(())
    }

    pub async fn remove(&self, session: &Session, key: &str) -> Result<(), AppError> {
        session.remove::<String>(key).await?;
        self.keep_expiry(session).await
    }

    /// Read and delete `key`
    pub async fn take(&self, session: &Session, key: &str) -> Result<Option<String>, AppError> {
        let value = session.remove::<String>(key).await?;
        self.keep_expiry(session).await?;
        Ok(value)
    }

    /// Move the session to a fresh ID, keeping its data
    pub async fn renew(&self, session: &Session) -> Result<(), AppError> {
        session.cycle_id().await?;
        self.keep_expiry(session).await
    }

    pub fn cleanup_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.config.cleanup_interval_seconds)
    }

    /// Re-apply the absolute expiry before a modified session is saved
    async fn keep_expiry(&self, session: &Session) -> Result<(), AppError> {
        if let Some(start) = session.get::<i64>(STARTED_AT_KEY).await? {
            session.set_expiry(Some(Expiry::AtDateTime(self.expires_at(start)?)));
        }
        Ok(())
    }

    fn expires_at(&self, start: i64) -> Result<OffsetDateTime, AppError> {
        let lifetime = time::Duration::seconds(self.config.lifetime_seconds);

        OffsetDateTime::from_unix_timestamp(start)
            .ok()
            .and_then(|start| start.checked_add(lifetime))
            .ok_or_else(|| {
                AppError::Config(format!(
                    "session.lifetime_seconds={} is out of range",
                    self.config.lifetime_seconds
                ))
            })
    }
}
