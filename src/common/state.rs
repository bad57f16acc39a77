// Application state shared across all modules

use std::sync::Arc;

use crate::auth::session::SessionManager;
use crate::auth::verifier::IdentityVerifier;
use crate::common::config::ClientEnv;
use crate::users::UserStore;

/// Handles built once in `main` and shared read-only by every request
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<dyn IdentityVerifier>,
    pub users: UserStore,
    pub sessions: SessionManager,
    pub client_env: ClientEnv,
}

/// The form in which handlers receive the state
pub type SharedState = Arc<AppState>;
