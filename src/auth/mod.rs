//! GitHub OAuth authentication
//!
//! Handles:
//! - GitHub OAuth flow
//! - Session management
//! - Authentication extractors

mod middleware;
mod oauth;
mod provider;
pub mod session;

pub use middleware::{MaybeProviderToken, ProviderToken};
pub use oauth::{auth_router, generate_state_token};
#[cfg(test)]
pub use provider::MockAuthorizationServer;
pub use provider::{AuthorizationServer, GitHubOAuth};
pub use session::SessionManager;
