//! Authentication routes

use axum::{routing::get, Router};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `GET /login` - Sign-in page
/// - `POST /login` - Exchange an ID token for a session
/// - `GET /logout` - Redirect home
/// - `POST /logout` - Destroy the session
pub fn auth_routes() -> Router {
    Router::new()
        .route("/login", get(handlers::login_form).post(handlers::login))
        .route(
            "/logout",
            get(handlers::logout_redirect).post(handlers::logout),
        )
}
