//! Service layer
//!
//! Outbound calls to the identity provider, kept out of the HTTP handlers.

mod github;

#[cfg(test)]
pub use github::MockProfileProvider;
pub use github::{GitHubClient, GitHubUser, ProfileProvider};
