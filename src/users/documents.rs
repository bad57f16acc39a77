// src/users/documents.rs
//! The document store seam.
//!
//! User records are kept as flat documents addressed by slash-separated
//! paths. Backends only need point reads and an all-or-nothing batch of
//! create-only writes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Document store unavailable: {0}")]
    Unavailable(String),

    #[error("Document already exists: {0}")]
    Conflict(String),

    /// Stored data breaks an invariant the write path guarantees.
    #[error("{0}")]
    InvariantViolation(String),

    #[error("Malformed document: {0}")]
    Malformed(String),
}

/// The value types user records need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    Null,
    String(String),
    Timestamp(DateTime<Utc>),
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(s) => FieldValue::String(s),
            None => FieldValue::Null,
        }
    }
}

pub type Fields = BTreeMap<String, FieldValue>;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(path: impl Into<String>, fields: Fields) -> Self {
        Self {
            path: path.into(),
            fields,
        }
    }

    pub fn string(&self, name: &str) -> Result<String, StoreError> {
        match self.fields.get(name) {
            Some(FieldValue::String(s)) => Ok(s.clone()),
            _ => Err(self.malformed(name, "string")),
        }
    }

    /// A string field that may be null or missing.
    pub fn optional_string(&self, name: &str) -> Result<Option<String>, StoreError> {
        match self.fields.get(name) {
            Some(FieldValue::String(s)) => Ok(Some(s.clone())),
            Some(FieldValue::Null) | None => Ok(None),
            Some(_) => Err(self.malformed(name, "string or null")),
        }
    }

    pub fn timestamp(&self, name: &str) -> Result<DateTime<Utc>, StoreError> {
        match self.fields.get(name) {
            Some(FieldValue::Timestamp(t)) => Ok(*t),
            _ => Err(self.malformed(name, "timestamp")),
        }
    }

    fn malformed(&self, name: &str, expected: &str) -> StoreError {
        StoreError::Malformed(format!(
            "{}: field '{}' is not a {}",
            self.path, name, expected
        ))
    }
}

/// A create-only write: it fails with `StoreError::Conflict` if the path
/// already holds a document.
pub type DocumentWrite = Document;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Point read; `Ok(None)` when nothing is stored at `path`.
    async fn get(&self, path: &str) -> Result<Option<Document>, StoreError>;

    /// Commit every write or none of them. Readers never observe a subset.
    async fn write_atomically(&self, writes: Vec<DocumentWrite>) -> Result<(), StoreError>;
}
