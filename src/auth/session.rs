//! Cookie-backed sessions.
//!
//! The whole session lives in the `__session` cookie as an encrypted JSON
//! payload; the server keeps no session table.

use axum::http::{header::COOKIE, HeaderMap};
use cookie::time::{Duration, OffsetDateTime};
use cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::services::encryption::EncryptionError;
use crate::services::EncryptionService;

pub const SESSION_COOKIE_NAME: &str = "__session";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session cipher error: {0}")]
    Cipher(#[from] EncryptionError),

    #[error("Session serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Session payload. Carries the user id and nothing else.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
}

impl Session {
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn set_user_id(&mut self, user_id: impl Into<String>) {
        self.user_id = Some(user_id.into());
    }
}

#[derive(Clone)]
pub struct SessionManager {
    cipher: Arc<EncryptionService>,
    secure: bool,
}

impl SessionManager {
    /// `secure` marks the cookie `Secure`; it is on in production.
    pub fn new(secret: &str, secure: bool) -> Result<Self, SessionError> {
        Ok(Self {
            cipher: Arc::new(EncryptionService::from_secret(secret)?),
            secure,
        })
    }

    pub fn new_session(&self) -> Session {
        Session::default()
    }

    /// Read the session from a `Cookie` header value.
    ///
    /// A missing, tampered, or foreign cookie yields an empty session.
    pub fn get_session(&self, cookie_header: Option<&str>) -> Session {
        let Some(header) = cookie_header else {
            return self.new_session();
        };

        for cookie_str in header.split(';') {
            let Ok(cookie) = Cookie::parse(cookie_str.trim()) else {
                continue;
            };
            if cookie.name() != SESSION_COOKIE_NAME {
                continue;
            }

            match self.open(cookie.value()) {
                Ok(session) => return session,
                Err(e) => debug!(error = %e, "Ignoring unreadable session cookie"),
            }
        }

        self.new_session()
    }

    /// Read the session from every `Cookie` header on a request
    pub fn get_session_from_headers(&self, headers: &HeaderMap) -> Session {
        let joined = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect::<Vec<_>>()
            .join("; ");

        if joined.is_empty() {
            self.new_session()
        } else {
            self.get_session(Some(&joined))
        }
    }

    /// Serialize the session into a `Set-Cookie` header value.
    pub fn commit_session(&self, session: &Session) -> Result<String, SessionError> {
        let payload = serde_json::to_string(session)?;
        let sealed = self.cipher.encrypt(&payload)?;

        Ok(self.base_cookie(sealed).build().to_string())
    }

    /// `Set-Cookie` header value that makes the browser drop the session.
    pub fn destroy_session(&self, _session: &Session) -> String {
        self.base_cookie(String::new())
            .max_age(Duration::ZERO)
            .expires(OffsetDateTime::UNIX_EPOCH)
            .build()
            .to_string()
    }

    fn base_cookie(&self, value: String) -> cookie::CookieBuilder<'static> {
        Cookie::build((SESSION_COOKIE_NAME, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
    }

    fn open(&self, sealed: &str) -> Result<Session, SessionError> {
        let payload = self.cipher.decrypt(sealed)?;
        Ok(serde_json::from_str(&payload)?)
    }
}
