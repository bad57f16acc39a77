//! Tests for pages module
//!
//! These tests verify page gating and output through the full router:
//! - Redirects and 404s on the profile page
//! - Sanitized and escaped profile output
//! - Client environment and health check

#[cfg(test)]
mod tests {
    use axum::http::{header, StatusCode};
    use tower::ServiceExt;

    use crate::app;
    use crate::test_support::{body_text, get_request, session_cookie, test_state, FakeIdentityVerifier};
    use crate::users::{CreateUserData, NewProfile};

    #[tokio::test]
    async fn test_profile_without_session_redirects_to_login() {
        let state = test_state(FakeIdentityVerifier::new()).await;

        let response = app(state).oneshot(get_request("/profile", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/login");
    }

    #[tokio::test]
    async fn test_profile_with_tampered_cookie_redirects_to_login() {
        let state = test_state(FakeIdentityVerifier::new()).await;

        let response = app(state)
            .oneshot(get_request("/profile", Some("__session=not-a-real-session")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/login");
    }

    #[tokio::test]
    async fn test_profile_for_unknown_user_is_not_found() {
        let state = test_state(FakeIdentityVerifier::new()).await;
        let cookie = session_cookie(&state, "uid-deleted");

        let response = app(state)
            .oneshot(get_request("/profile", Some(&cookie)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_text(response).await.contains("User not found"));
    }

    #[tokio::test]
    async fn test_profile_output_is_sanitized() {
        let state = test_state(FakeIdentityVerifier::new()).await;
        state
            .users
            .create_user(CreateUserData {
                id: "uid-x".to_string(),
                email: Some("x<y>@example.com".to_string()),
                profile: NewProfile {
                    display_name: Some("<script>alert(1)</script>Mallory".to_string()),
                    photo_url: Some("https://evil.example.com/p.png".to_string()),
                },
            })
            .await
            .unwrap();
        let cookie = session_cookie(&state, "uid-x");

        let response = app(state)
            .oneshot(get_request("/profile", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let page = body_text(response).await;
        assert!(page.contains("<dd>Mallory</dd>"));
        assert!(!page.contains("alert(1)"));
        assert!(!page.contains("evil.example.com"));
        assert!(page.contains("x&lt;y&gt;@example.com"));
    }

    #[tokio::test]
    async fn test_profile_shows_allowed_photo() {
        let state = test_state(FakeIdentityVerifier::new()).await;
        state
            .users
            .create_user(CreateUserData {
                id: "uid-p".to_string(),
                email: None,
                profile: NewProfile {
                    display_name: Some("Pat".to_string()),
                    photo_url: Some("https://lh3.googleusercontent.com/a/pat.png".to_string()),
                },
            })
            .await
            .unwrap();
        let cookie = session_cookie(&state, "uid-p");

        let response = app(state)
            .oneshot(get_request("/profile", Some(&cookie)))
            .await
            .unwrap();

        let page = body_text(response).await;
        assert!(page.contains(r#"src="https://lh3.googleusercontent.com/a/pat.png""#));
    }

    #[tokio::test]
    async fn test_home_is_public_and_greets_signed_in_user() {
        let state = test_state(FakeIdentityVerifier::new()).await;

        let response = app(state.clone()).oneshot(get_request("/", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let page = body_text(response).await;
        assert!(page.contains(r#"href="/login""#));
        assert!(page.contains(r#"window.ENV = {"MODE":"test","ALLOW_INDEXING":null};"#));
        assert!(page.contains("noindex"));

        state
            .users
            .create_user(CreateUserData {
                id: "uid-h".to_string(),
                email: Some("h@example.com".to_string()),
                profile: NewProfile {
                    display_name: Some("Hedy".to_string()),
                    photo_url: None,
                },
            })
            .await
            .unwrap();
        let cookie = session_cookie(&state, "uid-h");

        let response = app(state).oneshot(get_request("/about", Some(&cookie))).await.unwrap();
        let page = body_text(response).await;
        assert!(page.contains("Signed in as Hedy."));
        assert!(page.contains(r#"action="/logout""#));
    }

    #[tokio::test]
    async fn test_home_with_session_for_unknown_user_is_anonymous() {
        let state = test_state(FakeIdentityVerifier::new()).await;
        let cookie = session_cookie(&state, "uid-gone");

        let response = app(state).oneshot(get_request("/", Some(&cookie))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains(r#"href="/login""#));
    }

    #[tokio::test]
    async fn test_health() {
        let state = test_state(FakeIdentityVerifier::new()).await;

        let response = app(state).oneshot(get_request("/health", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, r#"{"status":"ok"}"#);
    }
}
