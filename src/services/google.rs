// src/services/google.rs
//! Google service-account client for the identity provider project.
//!
//! Mints OAuth2 access tokens from the configured service-account key,
//! fetches the public keys that sign end-user ID tokens, and looks up
//! provider accounts. Nothing here is cached: each call performs its own
//! round trip and returns the first failure it sees.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::common::config::FirebaseCredentials;

const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const SECURETOKEN_JWKS_URI: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const IDENTITY_TOOLKIT_BASE: &str = "https://identitytoolkit.googleapis.com/v1";
const FIRESTORE_BASE: &str = "https://firestore.googleapis.com/v1";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const SCOPES: &str = "https://www.googleapis.com/auth/cloud-platform \
                      https://www.googleapis.com/auth/datastore \
                      https://www.googleapis.com/auth/identitytoolkit \
                      https://www.googleapis.com/auth/userinfo.email";

/// Where each Google API lives. `Default` is production.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleEndpoints {
    pub token_uri: String,
    pub jwks_uri: String,
    pub identity_toolkit_base: String,
    pub firestore_base: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            token_uri: TOKEN_URI.to_string(),
            jwks_uri: SECURETOKEN_JWKS_URI.to_string(),
            identity_toolkit_base: IDENTITY_TOOLKIT_BASE.to_string(),
            firestore_base: FIRESTORE_BASE.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum GoogleError {
    #[error("Invalid service account credentials: {0}")]
    InvalidCredentials(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Google API returned {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),
}

/// One RSA public key from the provider's JWKS document.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SigningKey {
    pub kid: String,
    pub kty: String,
    pub n: String,
    pub e: String,
    #[serde(default)]
    pub alg: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SigningKeys {
    pub keys: Vec<SigningKey>,
}

impl SigningKeys {
    pub fn find(&self, kid: &str) -> Option<&SigningKey> {
        self.keys.iter().find(|k| k.kid == kid)
    }
}

/// Account record as held by the identity provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderAccount {
    pub local_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountLookupResponse {
    #[serde(default)]
    users: Vec<ProviderAccount>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AccountLookupRequest<'a> {
    local_id: [&'a str; 1],
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct AssertionClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub scope: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

pub struct GoogleService {
    http: Client,
    project_id: String,
    client_email: String,
    signing_key: EncodingKey,
    endpoints: GoogleEndpoints,
}

impl std::fmt::Debug for GoogleService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleService")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("signing_key", &"<redacted>")
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

impl GoogleService {
    /// Parses the service-account key up front so a bad key fails at startup.
    pub fn new(http: Client, credentials: &FirebaseCredentials) -> Result<Self, GoogleError> {
        let signing_key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes())
            .map_err(|e| GoogleError::InvalidCredentials(e.to_string()))?;

        Ok(Self {
            http,
            project_id: credentials.project_id.clone(),
            client_email: credentials.client_email.clone(),
            signing_key,
            endpoints: GoogleEndpoints::default(),
        })
    }

    /// Point every call at other hosts, e.g. an emulator.
    #[allow(dead_code)]
    pub fn with_endpoints(mut self, endpoints: GoogleEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn endpoints(&self) -> &GoogleEndpoints {
        &self.endpoints
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Signed JWT assertion exchanged for an access token.
    pub(crate) fn build_assertion(&self, now: DateTime<Utc>) -> Result<String, GoogleError> {
        let claims = AssertionClaims {
            iss: self.client_email.clone(),
            sub: self.client_email.clone(),
            aud: self.endpoints.token_uri.clone(),
            scope: SCOPES.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        };

        encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| GoogleError::InvalidCredentials(e.to_string()))
    }

    /// Exchange a fresh service-account assertion for an OAuth2 access token
    pub async fn access_token(&self) -> Result<String, GoogleError> {
        let assertion = self.build_assertion(Utc::now())?;

        let response = self
            .http
            .post(&self.endpoints.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, endpoint = %self.endpoints.token_uri, "HTTP error requesting service account token");
                GoogleError::RequestFailed(e.to_string())
            })?;

        let response = check_status(response).await?;
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| GoogleError::SerializationError(e.to_string()))?;

        debug!("Obtained service account access token");
        Ok(token.access_token)
    }

    /// Current public keys used to sign end-user ID tokens
    pub async fn fetch_signing_keys(&self) -> Result<SigningKeys, GoogleError> {
        let response = self
            .http
            .get(&self.endpoints.jwks_uri)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, endpoint = %self.endpoints.jwks_uri, "HTTP error fetching ID token signing keys");
                GoogleError::RequestFailed(e.to_string())
            })?;

        let response = check_status(response).await?;
        response
            .json::<SigningKeys>()
            .await
            .map_err(|e| GoogleError::SerializationError(e.to_string()))
    }

    /// Fetch the provider's account record for `uid`
    pub async fn lookup_account(&self, uid: &str) -> Result<ProviderAccount, GoogleError> {
        let access_token = self.access_token().await?;
        let url = format!(
            "{}/projects/{}/accounts:lookup",
            self.endpoints.identity_toolkit_base,
            urlencoding::encode(&self.project_id)
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(&AccountLookupRequest { local_id: [uid] })
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP error contacting identity toolkit");
                GoogleError::RequestFailed(e.to_string())
            })?;

        let response = check_status(response).await?;
        let body: AccountLookupResponse = response
            .json()
            .await
            .map_err(|e| GoogleError::SerializationError(e.to_string()))?;

        body.users
            .into_iter()
            .find(|account| account.local_id == uid)
            .ok_or_else(|| {
                warn!(uid = %uid, "Identity provider has no account for uid");
                GoogleError::AccountNotFound(uid.to_string())
            })
    }
}

/// Turns a non-success response into `GoogleError::ApiError` with its body.
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, GoogleError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!(http_status = %status, "Google API returned error status");
    Err(GoogleError::ApiError {
        status: status.as_u16(),
        body,
    })
}
