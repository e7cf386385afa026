//! User endpoints

use axum::{Json, Router, extract::State, routing::get};

use crate::AppState;
use crate::api::dto::UserProfileResponse;
use crate::auth::ProviderToken;
use crate::error::AppError;

/// Create user router
///
/// Routes:
/// - GET /profile - Current user's GitHub profile
pub fn user_router() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile))
}

/// GET /api/user/profile
///
/// Fetches the profile live from GitHub with the session's access token.
async fn get_profile(
    State(state): State<AppState>,
    ProviderToken(access_token): ProviderToken,
) -> Result<Json<UserProfileResponse>, AppError> {
    let user = state.profiles.fetch_profile(&access_token).await?;
    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MockAuthorizationServer;
    use crate::auth::session::ACCESS_TOKEN_KEY;
    use crate::service::{GitHubUser, MockProfileProvider};
    use crate::test_utils::{body_json, session_cookie, test_app, test_state};
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    fn profile_request(cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/profile");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn anonymous_request_is_unauthorized_without_provider_call() {
        let mut profiles = MockProfileProvider::new();
        profiles.expect_fetch_profile().never();
        let (state, store) = test_state(MockAuthorizationServer::new(), profiles);

        let response = test_app(user_router(), &state, &store)
            .oneshot(profile_request(None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "error": "Not authenticated" })
        );
    }

    #[tokio::test]
    async fn authenticated_request_returns_profile() {
        let mut profiles = MockProfileProvider::new();
        profiles.expect_fetch_profile().times(1).returning(|token| {
            assert_eq!(token, "gho_unit");
            Ok(GitHubUser {
                id: 7,
                login: "someone".to_string(),
                name: None,
                email: Some("someone@example.test".to_string()),
                avatar_url: None,
                bio: None,
                company: None,
                location: None,
                blog: None,
                created_at: None,
                updated_at: None,
            })
        });
        let (state, store) = test_state(MockAuthorizationServer::new(), profiles);
        let cookie = session_cookie(&state, &store, ACCESS_TOKEN_KEY, "gho_unit").await;

        let response = test_app(user_router(), &state, &store)
            .oneshot(profile_request(Some(&cookie)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["login"], "someone");
        assert_eq!(body["email"], "someone@example.test");
        assert!(body["name"].is_null());
    }

    #[tokio::test]
    async fn provider_failure_is_generic_server_error() {
        let mut profiles = MockProfileProvider::new();
        profiles
            .expect_fetch_profile()
            .returning(|_| Err(AppError::Provider("status 403: rate limit".to_string())));
        let (state, store) = test_state(MockAuthorizationServer::new(), profiles);
        let cookie = session_cookie(&state, &store, ACCESS_TOKEN_KEY, "gho_unit").await;

        let response = test_app(user_router(), &state, &store)
            .oneshot(profile_request(Some(&cookie)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "error": "Failed to fetch profile" })
        );
    }
}
