// src/users/firestore.rs
//! Cloud Firestore implementation of the document store, over the REST API.
//!
//! Batches go through `documents:commit` with an `exists: false`
//! precondition on every write, which Firestore applies atomically.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::documents::{Document, DocumentStore, DocumentWrite, FieldValue, Fields, StoreError};
use crate::services::google::{GoogleError, GoogleService};

pub struct FirestoreDocumentStore {
    google: Arc<GoogleService>,
}

#[derive(Debug, Deserialize)]
struct FirestoreDocument {
    #[serde(default)]
    fields: Map<String, Value>,
}

impl FirestoreDocumentStore {
    pub fn new(google: Arc<GoogleService>) -> Self {
        Self { google }
    }

    /// `projects/{p}/databases/(default)/documents`
    fn database_root(&self) -> String {
        format!(
            "projects/{}/databases/(default)/documents",
            self.google.project_id()
        )
    }

    /// Resource name as it appears in request bodies, unencoded.
    fn document_name(&self, path: &str) -> String {
        format!("{}/{}", self.database_root(), path)
    }

    fn document_url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.google.endpoints().firestore_base,
            self.database_root(),
            encode_path(path)
        )
    }

    fn commit_url(&self) -> String {
        format!(
            "{}/{}:commit",
            self.google.endpoints().firestore_base,
            self.database_root()
        )
    }

    async fn access_token(&self) -> Result<String, StoreError> {
        self.google
            .access_token()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

pub(crate) fn encode_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => json!({ "nullValue": null }),
        FieldValue::String(s) => json!({ "stringValue": s }),
        FieldValue::Timestamp(t) => {
            json!({ "timestampValue": t.to_rfc3339_opts(SecondsFormat::Micros, true) })
        }
    }
}

pub(crate) fn encode_fields(fields: &Fields) -> Value {
    let map: Map<String, Value> = fields
        .iter()
        .map(|(name, value)| (name.clone(), encode_value(value)))
        .collect();
    Value::Object(map)
}

pub(crate) fn decode_value(value: &Value) -> Result<FieldValue, String> {
    let object = value
        .as_object()
        .ok_or_else(|| "field value is not an object".to_string())?;

    if object.contains_key("nullValue") {
        return Ok(FieldValue::Null);
    }
    if let Some(s) = object.get("stringValue").and_then(Value::as_str) {
        return Ok(FieldValue::String(s.to_string()));
    }
    if let Some(raw) = object.get("timestampValue").and_then(Value::as_str) {
        let parsed = DateTime::parse_from_rfc3339(raw)
            .map_err(|e| format!("invalid timestamp '{}': {}", raw, e))?;
        return Ok(FieldValue::Timestamp(parsed.with_timezone(&Utc)));
    }

    Err(format!("unsupported field value: {}", value))
}

pub(crate) fn decode_fields(fields: &Map<String, Value>) -> Result<Fields, String> {
    fields
        .iter()
        .map(|(name, value)| decode_value(value).map(|v| (name.clone(), v)))
        .collect()
}

fn is_conflict(status: u16, body: &str) -> bool {
    status == 409 || body.contains("ALREADY_EXISTS") || body.contains("FAILED_PRECONDITION")
}

#[async_trait]
impl DocumentStore for FirestoreDocumentStore {
    async fn get(&self, path: &str) -> Result<Option<Document>, StoreError> {
        let token = self.access_token().await?;
        let url = self.document_url(path);

        let response = self
            .google
            .http()
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, path = %path, "HTTP error reading Firestore document");
                StoreError::Unavailable(e.to_string())
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!(path = %path, "Firestore document not found");
            return Ok(None);
        }

        let response = crate::services::google::check_status(response)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let doc: FirestoreDocument = response
            .json()
            .await
            .map_err(|e| StoreError::Malformed(format!("{}: {}", path, e)))?;

        let fields = decode_fields(&doc.fields)
            .map_err(|e| StoreError::Malformed(format!("{}: {}", path, e)))?;

        Ok(Some(Document::new(path, fields)))
    }

    async fn write_atomically(&self, writes: Vec<DocumentWrite>) -> Result<(), StoreError> {
        let token = self.access_token().await?;
        let url = self.commit_url();

        let commit_writes: Vec<Value> = writes
            .iter()
            .map(|write| {
                json!({
                    "update": {
                        "name": self.document_name(&write.path),
                        "fields": encode_fields(&write.fields),
                    },
                    "currentDocument": { "exists": false },
                })
            })
            .collect();
        let body = json!({ "writes": commit_writes });

        let response = self
            .google
            .http()
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP error committing Firestore batch");
                StoreError::Unavailable(e.to_string())
            })?;

        match crate::services::google::check_status(response).await {
            Ok(_) => {
                debug!(documents = writes.len(), "Committed Firestore batch");
                Ok(())
            }
            Err(GoogleError::ApiError { status, body }) if is_conflict(status, &body) => {
                let paths: Vec<&str> = writes.iter().map(|w| w.path.as_str()).collect();
                warn!(paths = ?paths, "Firestore rejected create, document already exists");
                Err(StoreError::Conflict(paths.join(", ")))
            }
            Err(e) => Err(StoreError::Unavailable(e.to_string())),
        }
    }
}
