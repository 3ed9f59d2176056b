//! SQLite-backed [`Store`].
//!
//! Embeddings are stored inline on the `chunks` row as little-endian `f32`
//! BLOBs together with their dimensionality. Lexical relevance comes from
//! the FTS5 `chunks_fts` table; its `bm25()` rank is mapped onto the shared
//! raw scale by [`bm25_to_raw`].

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::debug;

use super::{check_chunk_dims, RankingCandidate, Store};
use crate::db;
use crate::embedding::{blob_to_vec, vec_to_blob};
use crate::error::{RagError, Result};
use crate::lexical::{bm25_to_raw, fts_match_expr};
use crate::migrate;
use crate::models::{Chunk, ContentKind, Document};

pub struct SqliteStore {
    pool: SqlitePool,
    fts: bool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, fts: bool) -> Self {
        Self { pool, fts }
    }

    /// Connect to `db_path` and bring the schema up to date.
    pub async fn open(db_path: &Path) -> Result<Self> {
        let pool = db::connect(db_path).await?;
        let fts = migrate::run_migrations(&pool).await?;
        Ok(Self::new(pool, fts))
    }

    pub fn has_lexical(&self) -> bool {
        self.fts
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

const CHUNK_COLUMNS: &str = "c.id, c.document_id, c.chunk_index, c.text, c.language, \
     c.symbol_name, c.start_line, c.end_line, c.hash, c.embedding";

fn chunk_from_row(row: &SqliteRow) -> Chunk {
    let blob: Option<Vec<u8>> = row.get("embedding");
    Chunk {
        id: row.get("id"),
        document_id: row.get("document_id"),
        chunk_index: row.get("chunk_index"),
        text: row.get("text"),
        language: row.get("language"),
        symbol_name: row.get("symbol_name"),
        start_line: row.get("start_line"),
        end_line: row.get("end_line"),
        hash: row.get("hash"),
        embedding: blob.map(|b| blob_to_vec(&b)),
    }
}

async fn write_document(conn: &mut SqliteConnection, doc: &Document) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO documents (id, course_id, category, title, source_path, kind, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            course_id = excluded.course_id,
            category = excluded.category,
            title = excluded.title,
            source_path = excluded.source_path,
            kind = excluded.kind
        "#,
    )
    .bind(&doc.id)
    .bind(&doc.course_id)
    .bind(&doc.category)
    .bind(&doc.title)
    .bind(&doc.source_path)
    .bind(doc.kind.as_str())
    .bind(doc.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Dimension check, then delete-and-insert. Callers own the transaction.
async fn write_chunks(
    conn: &mut SqliteConnection,
    fts: bool,
    document_id: &str,
    chunks: &[Chunk],
) -> Result<()> {
    let corpus: Option<i64> = sqlx::query_scalar(
        "SELECT dims FROM chunks WHERE document_id != ? AND dims IS NOT NULL LIMIT 1",
    )
    .bind(document_id)
    .fetch_optional(&mut *conn)
    .await?;
    check_chunk_dims(chunks, corpus.map(|d| d as usize))?;

    if fts {
        sqlx::query("DELETE FROM chunks_fts WHERE document_id = ?")
            .bind(document_id)
            .execute(&mut *conn)
            .await?;
    }
    sqlx::query("DELETE FROM chunks WHERE document_id = ?")
        .bind(document_id)
        .execute(&mut *conn)
        .await?;

    for chunk in chunks {
        let blob = chunk.embedding.as_deref().map(vec_to_blob);
        let dims = chunk.embedding.as_ref().map(|e| e.len() as i64);
        sqlx::query(
            r#"
            INSERT INTO chunks (id, document_id, chunk_index, text, language, symbol_name,
                                start_line, end_line, hash, embedding, dims)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&chunk.id)
        .bind(document_id)
        .bind(chunk.chunk_index)
        .bind(&chunk.text)
        .bind(&chunk.language)
        .bind(&chunk.symbol_name)
        .bind(chunk.start_line)
        .bind(chunk.end_line)
        .bind(&chunk.hash)
        .bind(blob)
        .bind(dims)
        .execute(&mut *conn)
        .await?;

        if fts {
            sqlx::query("INSERT INTO chunks_fts (chunk_id, document_id, text) VALUES (?, ?, ?)")
                .bind(&chunk.id)
                .bind(document_id)
                .bind(&chunk.text)
                .execute(&mut *conn)
                .await?;
        }
    }
    Ok(())
}

#[async_trait]
impl Store for SqliteStore {
    async fn upsert_document(&self, doc: &Document) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        write_document(&mut conn, doc).await
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query(
            "SELECT id, course_id, category, title, source_path, kind, created_at FROM documents WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| {
            let kind: String = r.get("kind");
            Document {
                id: r.get("id"),
                course_id: r.get("course_id"),
                category: r.get("category"),
                title: r.get("title"),
                source_path: r.get("source_path"),
                kind: ContentKind::parse(&kind).unwrap_or(ContentKind::Text),
                created_at: r.get("created_at"),
            }
        }))
    }

    async fn replace_chunks(&self, document_id: &str, chunks: &[Chunk]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        write_chunks(&mut tx, self.fts, document_id, chunks).await?;
        tx.commit().await?;
        debug!(document_id, chunks = chunks.len(), "replaced chunks");
        Ok(())
    }

    async fn replace_document(&self, doc: &Document, chunks: &[Chunk]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        write_document(&mut tx, doc).await?;
        write_chunks(&mut tx, self.fts, &doc.id, chunks).await?;
        tx.commit().await?;
        debug!(document_id = %doc.id, chunks = chunks.len(), "replaced document");
        Ok(())
    }

    async fn list_chunks(&self, document_id: &str) -> Result<Vec<Chunk>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM chunks c WHERE c.document_id = ? ORDER BY c.chunk_index ASC",
            CHUNK_COLUMNS
        ))
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(chunk_from_row).collect())
    }

    async fn ranking_candidates(&self) -> Result<Vec<RankingCandidate>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}, d.title, d.course_id, d.category
            FROM chunks c
            JOIN documents d ON d.id = c.document_id
            WHERE c.embedding IS NOT NULL
            ORDER BY c.rowid
            "#,
            CHUNK_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| RankingCandidate {
                chunk: chunk_from_row(row),
                document_title: row.get("title"),
                course_id: row.get("course_id"),
                category: row.get("category"),
            })
            .collect())
    }

    async fn lexical_relevance(&self, query_text: &str) -> Result<HashMap<String, f64>> {
        if !self.fts {
            return Err(RagError::Infrastructure(
                "SQLite build has no FTS5 support".to_string(),
            ));
        }
        let Some(expr) = fts_match_expr(query_text) else {
            return Ok(HashMap::new());
        };

        let rows = sqlx::query(
            "SELECT chunk_id, bm25(chunks_fts) AS score FROM chunks_fts WHERE chunks_fts MATCH ?",
        )
        .bind(expr)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let id: String = row.get("chunk_id");
                let bm25: f64 = row.get("score");
                (id, bm25_to_raw(bm25))
            })
            .filter(|(_, raw)| *raw > 0.0)
            .collect())
    }

    async fn corpus_dims(&self) -> Result<Option<usize>> {
        let dims: Option<i64> =
            sqlx::query_scalar("SELECT dims FROM chunks WHERE dims IS NOT NULL LIMIT 1")
                .fetch_optional(&self.pool)
                .await?;
        Ok(dims.map(|d| d as usize))
    }
}
