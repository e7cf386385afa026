//! Conversion functions from provider models to API DTOs

use crate::api::dto::UserProfileResponse;
use crate::service::GitHubUser;

impl From<GitHubUser> for UserProfileResponse {
    fn from(user: GitHubUser) -> Self {
        UserProfileResponse {
            id: user.id,
            login: user.login,
            name: user.name,
            email: user.email,
            avatar_url: user.avatar_url,
            bio: user.bio,
            company: user.company,
            location: user.location,
            blog: user.blog,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}
