// src/users/sqlite.rs
//! SQLite implementation of the document store.

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use super::documents::{Document, DocumentStore, DocumentWrite, Fields, StoreError};

pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn map_insert_error(err: sqlx::Error, path: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            warn!(path = %path, "Create rejected, document already exists");
            StoreError::Conflict(path.to_string())
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get(&self, path: &str) -> Result<Option<Document>, StoreError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT fields FROM documents WHERE path = ?")
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some((raw,)) => {
                let fields: Fields = serde_json::from_str(&raw)
                    .map_err(|e| StoreError::Malformed(format!("{}: {}", path, e)))?;
                Ok(Some(Document::new(path, fields)))
            }
            None => Ok(None),
        }
    }

    async fn write_atomically(&self, writes: Vec<DocumentWrite>) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        for write in &writes {
            let fields = serde_json::to_string(&write.fields)
                .map_err(|e| StoreError::Malformed(format!("{}: {}", write.path, e)))?;

            // Dropping `tx` on an early return rolls the batch back.
            sqlx::query("INSERT INTO documents (path, fields) VALUES (?, ?)")
                .bind(&write.path)
                .bind(fields)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_insert_error(e, &write.path))?;
        }

        tx.commit().await?;
        debug!(documents = writes.len(), "Committed document batch");
        Ok(())
    }
}
