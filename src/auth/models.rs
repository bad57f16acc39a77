//! Authentication data models

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// User-facing message when the sign-in form is missing its token
pub const INVALID_FORM_SUBMISSION: &str = "Invalid form submission";

/// User-facing message for every verification or provisioning failure
pub const AUTHENTICATION_FAILED: &str = "Authentication failed";

#[derive(Debug, Error)]
pub enum AuthError {
    /// Token was malformed, expired, or not signed by the provider.
    #[error("Invalid token")]
    InvalidToken,

    /// The provider could not be reached or rejected an admin call.
    #[error("Identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Collapsed outcome of `authenticate`; the cause is only logged.
    #[error("Authentication failed")]
    AuthenticationFailed,
}

/// Identity asserted by the provider for a verified token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

/// Result of a successful sign-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
}

/// Form body posted by the sign-in page
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(rename = "idToken")]
    pub id_token: Option<String>,
}
