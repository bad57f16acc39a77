// src/common/config.rs
//! Environment configuration, validated eagerly at startup.
//!
//! Every required variable is checked before the server binds, and all
//! problems are reported together so a misconfigured deploy fails once with
//! the full list instead of one variable at a time.

use serde::Serialize;
use std::env;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Runtime mode, taken from `NODE_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeEnv {
    Production,
    Development,
    Test,
}

impl NodeEnv {
    pub fn is_production(&self) -> bool {
        matches!(self, NodeEnv::Production)
    }
}

impl FromStr for NodeEnv {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "production" => Ok(NodeEnv::Production),
            "development" => Ok(NodeEnv::Development),
            "test" => Ok(NodeEnv::Test),
            other => Err(format!(
                "expected one of production, development, test (got '{}')",
                other
            )),
        }
    }
}

impl fmt::Display for NodeEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeEnv::Production => "production",
            NodeEnv::Development => "development",
            NodeEnv::Test => "test",
        };
        f.write_str(s)
    }
}

/// Which document store backs the user records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    Sqlite { database_url: String },
}

/// Service-account credentials for the identity provider project.
#[derive(Clone)]
pub struct FirebaseCredentials {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
}

impl fmt::Debug for FirebaseCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirebaseCredentials")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// A single invalid or missing variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variables: {}", format_fields(.0))]
    InvalidEnvironment(Vec<FieldError>),
}

fn format_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Variables safe to hand to the browser.
#[derive(Debug, Clone, Serialize)]
pub struct ClientEnv {
    #[serde(rename = "MODE")]
    pub mode: NodeEnv,
    #[serde(rename = "ALLOW_INDEXING")]
    pub allow_indexing: Option<String>,
}

impl ClientEnv {
    pub fn indexing_allowed(&self) -> bool {
        self.allow_indexing
            .as_deref()
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1"))
            .unwrap_or(false)
    }
}

#[derive(Clone)]
pub struct Config {
    pub node_env: NodeEnv,
    pub session_secret: String,
    pub firebase: FirebaseCredentials,
    pub allow_indexing: Option<String>,
    pub store_backend: StoreBackend,
    pub reset_db: bool,
    pub port: u16,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("node_env", &self.node_env)
            .field("session_secret", &"<redacted>")
            .field("firebase", &self.firebase)
            .field("allow_indexing", &self.allow_indexing)
            .field("store_backend", &self.store_backend)
            .field("reset_db", &self.reset_db)
            .field("port", &self.port)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut errors = Vec::new();

        let mut required = |field: &'static str| -> Option<String> {
            match lookup(field) {
                Some(value) if !value.trim().is_empty() => Some(value),
                Some(_) => {
                    errors.push(FieldError {
                        field,
                        message: "must not be empty".to_string(),
                    });
                    None
                }
                None => {
                    errors.push(FieldError {
                        field,
                        message: "is required".to_string(),
                    });
                    None
                }
            }
        };

        let node_env_raw = required("NODE_ENV");
        let session_secret = required("SESSION_SECRET");
        let project_id = required("FIREBASE_PROJECT_ID");
        let client_email = required("FIREBASE_CLIENT_EMAIL");
        let private_key = required("FIREBASE_PRIVATE_KEY");

        let node_env = node_env_raw.and_then(|raw| match raw.parse::<NodeEnv>() {
            Ok(env) => Some(env),
            Err(message) => {
                errors.push(FieldError {
                    field: "NODE_ENV",
                    message,
                });
                None
            }
        });

        let store_backend = match lookup("STORE_BACKEND").as_deref().map(str::trim) {
            None | Some("") | Some("firestore") => Some(StoreBackend::Firestore),
            Some("sqlite") => Some(StoreBackend::Sqlite {
                database_url: lookup("DATABASE_URL")
                    .unwrap_or_else(|| "sqlite://starter.db".to_string()),
            }),
            Some(other) => {
                errors.push(FieldError {
                    field: "STORE_BACKEND",
                    message: format!("expected firestore or sqlite (got '{}')", other),
                });
                None
            }
        };

        let port = match lookup("PORT") {
            None => Some(8080),
            Some(raw) => match raw.trim().parse::<u16>() {
                Ok(port) => Some(port),
                Err(_) => {
                    errors.push(FieldError {
                        field: "PORT",
                        message: format!("not a valid port: '{}'", raw),
                    });
                    None
                }
            },
        };

        match (
            node_env,
            session_secret,
            project_id,
            client_email,
            private_key,
            store_backend,
            port,
        ) {
            (
                Some(node_env),
                Some(session_secret),
                Some(project_id),
                Some(client_email),
                Some(private_key),
                Some(store_backend),
                Some(port),
            ) if errors.is_empty() => Ok(Config {
                node_env,
                session_secret,
                firebase: FirebaseCredentials {
                    project_id,
                    client_email,
                    // Keys pasted into .env files carry escaped newlines.
                    private_key: private_key.replace("\\n", "\n"),
                },
                allow_indexing: lookup("ALLOW_INDEXING"),
                store_backend,
                reset_db: lookup("RESET_DB").as_deref() == Some("true"),
                port,
            }),
            _ => Err(ConfigError::InvalidEnvironment(errors)),
        }
    }

    pub fn client_env(&self) -> ClientEnv {
        ClientEnv {
            mode: self.node_env,
            allow_indexing: self.allow_indexing.clone(),
        }
    }

    pub fn secure_cookies(&self) -> bool {
        self.node_env.is_production()
    }
}
