//! Page routes

use axum::{routing::get, Router};

use super::handlers;

/// Creates and returns the page router
///
/// # Routes
/// - `GET /` - Home (signed-in user optional)
/// - `GET /about` - About (signed-in user optional)
/// - `GET /profile` - Profile (signed-in user required)
/// - `GET /health` - Liveness check
pub fn pages_routes() -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/about", get(handlers::about))
        .route("/profile", get(handlers::profile))
        .route("/health", get(handlers::health))
}
