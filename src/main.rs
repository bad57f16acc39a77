// src/main.rs
use axum::{extract::Extension, middleware, Router};
use dotenv::dotenv;
use reqwest::Client;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::PathBuf;
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// ============================================================================
// MODULE IMPORTS
// ============================================================================

mod auth;
mod common;
mod logging_middleware;
mod pages;
mod services;
mod users;

#[cfg(test)]
mod test_support;

// ============================================================================
// COMMON IMPORTS
// ============================================================================

use auth::{FirebaseVerifier, SessionManager};
use common::config::StoreBackend;
use common::{AppState, Config, SharedState};
use services::GoogleService;
use users::{firestore::FirestoreDocumentStore, sqlite::SqliteDocumentStore, DocumentStore, UserStore};

/// Compose every route with the shared state and middleware layers
pub fn app(state: SharedState) -> Router {
    Router::new()
        // ====================================================================
        // AUTHENTICATION ROUTES (Login, Logout)
        // ====================================================================
        .merge(auth::auth_routes())
        // ====================================================================
        // PAGE ROUTES (Home, About, Profile, Health)
        // ====================================================================
        .merge(pages::pages_routes())
        // ====================================================================
        // MIDDLEWARE AND LAYERS
        // ====================================================================
        .layer(middleware::from_fn(logging_middleware::log_request_response))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
}

async fn open_sqlite(database_url: &str, reset: bool) -> anyhow::Result<Arc<dyn DocumentStore>> {
    if let Some(path_part) = database_url.strip_prefix("sqlite://") {
        let path_without_params = path_part.split('?').next().unwrap_or("");
        if !path_without_params.is_empty() && !path_without_params.starts_with(':') {
            let db_path = PathBuf::from(path_without_params);
            if let Some(parent) = db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }
    }

    let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .connect_with(connect_options)
        .await?;

    common::migrations::run_migrations(&pool, reset).await?;

    Ok(Arc::new(SqliteDocumentStore::new(pool)))
}

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // ========================================================================
    // ENVIRONMENT CONFIGURATION
    // ========================================================================

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid environment configuration");
            return Err(e.into());
        }
    };
    info!(mode = %config.node_env, "Configuration loaded");

    // ========================================================================
    // SERVICE INITIALIZATION
    // ========================================================================

    let http_client = Client::builder().build()?;

    let google_service = Arc::new(GoogleService::new(http_client, &config.firebase)?);
    info!(project_id = %google_service.project_id(), "GoogleService initialized");

    let documents: Arc<dyn DocumentStore> = match &config.store_backend {
        StoreBackend::Firestore => {
            info!("Using Firestore document store");
            Arc::new(FirestoreDocumentStore::new(google_service.clone()))
        }
        StoreBackend::Sqlite { database_url } => {
            info!(database_url = %database_url, reset = config.reset_db, "Using SQLite document store");
            open_sqlite(database_url, config.reset_db).await?
        }
    };

    let sessions = SessionManager::new(&config.session_secret, config.secure_cookies())?;

    // ========================================================================
    // APPLICATION STATE
    // ========================================================================

    let app_state = AppState {
        identity: Arc::new(FirebaseVerifier::new(google_service)),
        users: UserStore::new(documents),
        sessions,
        client_env: config.client_env(),
    };

    let router = app(Arc::new(app_state));

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router.into_make_service()).await?;

    Ok(())
}
