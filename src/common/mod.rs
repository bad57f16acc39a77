// Common module - shared types and utilities across all modules

pub mod config;
pub mod error;
pub mod helpers;
pub mod migrations;
pub mod state;

// Re-export commonly used types for convenience
pub use config::{ClientEnv, Config};
pub use error::ApiError;
pub use helpers::{html_escape, safe_optional_email_log, safe_token_log};
pub use state::{AppState, SharedState};
