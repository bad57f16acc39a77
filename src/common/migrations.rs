// src/common/migrations.rs
//! Schema management for the SQLite document store

use sqlx::SqlitePool;
use tracing::{info, warn};

/// Run all database migrations
///
/// `reset` drops the documents table first. It is wired to `RESET_DB=true`
/// so a restart never loses data unless explicitly asked to.
pub async fn run_migrations(pool: &SqlitePool, reset: bool) -> Result<(), sqlx::Error> {
    if reset {
        warn!("⚠️  RESET_DB=true - Dropping document tables and recreating schema...");
        drop_all_tables(pool).await?;
        info!("✅ Dropped old tables");
    } else {
        info!("ℹ️  Skipping table drop (RESET_DB not set). Tables will be created if they don't exist.");
    }

    create_document_tables(pool).await?;

    info!("✅ Database migration completed successfully!");

    Ok(())
}

async fn drop_all_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("DROP TABLE IF EXISTS documents")
        .execute(pool)
        .await?;
    Ok(())
}

/// One row per document; `path` mirrors the Firestore document path
/// (`users/{id}`, `users/{id}/profile/main`) so both backends share layout.
async fn create_document_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            path TEXT PRIMARY KEY,
            fields TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
