//! API response DTOs
//!
//! JSON bodies returned to the frontend.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Profile response for `GET /api/user/profile`
///
/// Mirrors the GitHub fields the frontend renders. Fields GitHub left
/// empty are sent as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfileResponse {
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

/// Liveness response for `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
