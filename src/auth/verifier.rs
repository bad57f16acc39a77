//! Identity provider seam.
//!
//! `FirebaseVerifier` checks RS256 ID tokens against the provider's published
//! keys and reads account records through the admin API. Tests swap in a fake
//! through the `IdentityVerifier` trait.

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::models::{AuthError, Claims};
use crate::services::google::{GoogleService, SigningKeys};

const ISSUER_PREFIX: &str = "https://securetoken.google.com/";

/// Provider user ids are at most 128 characters.
const MAX_UID_LEN: usize = 128;

/// Clock skew tolerated on `auth_time`, matching the `exp` leeway.
const AUTH_TIME_LEEWAY_SECS: i64 = 60;

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verify a client-supplied ID token and return its claims.
    async fn verify(&self, token: &str) -> Result<Claims, AuthError>;

    /// Fetch the provider's current record for `uid`.
    async fn get_user(&self, uid: &str) -> Result<Claims, AuthError>;
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
    #[serde(default)]
    auth_time: Option<i64>,
}

/// Decode and validate an ID token against an already-fetched key set.
pub(crate) fn decode_id_token(
    token: &str,
    keys: &SigningKeys,
    project_id: &str,
    now: i64,
) -> Result<Claims, AuthError> {
    let header = decode_header(token).map_err(|e| {
        debug!(error = %e, "ID token header is not decodable");
        AuthError::InvalidToken
    })?;

    if header.alg != Algorithm::RS256 {
        debug!(alg = ?header.alg, "ID token uses unexpected algorithm");
        return Err(AuthError::InvalidToken);
    }

    let kid = header.kid.ok_or(AuthError::InvalidToken)?;
    let key = keys.find(&kid).ok_or_else(|| {
        debug!(kid = %kid, "ID token signed with unknown key");
        AuthError::InvalidToken
    })?;

    let decoding_key =
        DecodingKey::from_rsa_components(&key.n, &key.e).map_err(|_| AuthError::InvalidToken)?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[project_id]);
    validation.set_issuer(&[format!("{}{}", ISSUER_PREFIX, project_id)]);
    validation.set_required_spec_claims(&["exp", "iat", "aud", "iss", "sub"]);

    let data = decode::<IdTokenClaims>(token, &decoding_key, &validation).map_err(|e| {
        debug!(error = %e, "ID token failed validation");
        AuthError::InvalidToken
    })?;
    let claims = data.claims;

    if claims.sub.is_empty() || claims.sub.len() > MAX_UID_LEN {
        return Err(AuthError::InvalidToken);
    }

    if let Some(auth_time) = claims.auth_time {
        if auth_time > now + AUTH_TIME_LEEWAY_SECS {
            debug!("ID token auth_time is in the future");
            return Err(AuthError::InvalidToken);
        }
    }

    Ok(Claims {
        uid: claims.sub,
        email: claims.email,
        display_name: claims.name,
        photo_url: claims.picture,
    })
}

pub struct FirebaseVerifier {
    google: Arc<GoogleService>,
}

impl FirebaseVerifier {
    pub fn new(google: Arc<GoogleService>) -> Self {
        Self { google }
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let keys = self.google.fetch_signing_keys().await.map_err(|e| {
            warn!(error = %e, "Could not fetch ID token signing keys");
            AuthError::InvalidToken
        })?;

        decode_id_token(
            token,
            &keys,
            self.google.project_id(),
            chrono::Utc::now().timestamp(),
        )
    }

    async fn get_user(&self, uid: &str) -> Result<Claims, AuthError> {
        let account = self
            .google
            .lookup_account(uid)
            .await
            .map_err(|e| AuthError::ProviderUnavailable(e.to_string()))?;

        Ok(Claims {
            uid: account.local_id,
            email: account.email,
            display_name: account.display_name,
            photo_url: account.photo_url,
        })
    }
}
