use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::Result;

/// Create tables and indexes. Safe to run repeatedly.
///
/// Returns whether the `chunks_fts` full-text table is available. A SQLite
/// build without FTS5 still migrates; lexical ranking is then unavailable.
pub async fn run_migrations(pool: &SqlitePool) -> Result<bool> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            course_id TEXT,
            category TEXT,
            title TEXT NOT NULL,
            source_path TEXT NOT NULL,
            kind TEXT NOT NULL DEFAULT 'text',
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            document_id TEXT NOT NULL,
            chunk_index INTEGER NOT NULL,
            text TEXT NOT NULL,
            language TEXT,
            symbol_name TEXT,
            start_line INTEGER,
            end_line INTEGER,
            hash TEXT NOT NULL,
            embedding BLOB,
            dims INTEGER,
            UNIQUE(document_id, chunk_index),
            FOREIGN KEY (document_id) REFERENCES documents(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_document_id ON chunks(document_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_course ON documents(course_id)")
        .execute(pool)
        .await?;

    // FTS5 CREATE is not idempotent natively, so we check first
    if fts_table_exists(pool).await? {
        return Ok(true);
    }

    let created = sqlx::query(
        r#"
        CREATE VIRTUAL TABLE chunks_fts USING fts5(
            chunk_id UNINDEXED,
            document_id UNINDEXED,
            text
        )
        "#,
    )
    .execute(pool)
    .await;

    match created {
        Ok(_) => {
            info!("created chunks_fts full-text index");
            Ok(true)
        }
        Err(e) => {
            warn!(error = %e, "FTS5 unavailable, lexical ranking disabled");
            Ok(false)
        }
    }
}

pub async fn fts_table_exists(pool: &SqlitePool) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='chunks_fts'",
    )
    .fetch_one(pool)
    .await?;
    Ok(exists)
}
