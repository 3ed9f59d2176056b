//! Storage abstraction.
//!
//! The [`Store`] trait covers everything ingestion and ranking need from
//! persistence. Implementations must be `Send + Sync`; they are shared via
//! `Arc` between concurrent requests.
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`upsert_document`](Store::upsert_document) | Insert or update a document record |
//! | [`get_document`](Store::get_document) | Fetch a document record by id |
//! | [`replace_chunks`](Store::replace_chunks) | Atomically swap a document's chunk set |
//! | [`replace_document`](Store::replace_document) | Upsert a document and swap its chunks as one unit |
//! | [`list_chunks`](Store::list_chunks) | A document's chunks in index order |
//! | [`ranking_candidates`](Store::ranking_candidates) | Every embedded chunk, in storage order |
//! | [`lexical_relevance`](Store::lexical_relevance) | Raw full-text relevance per chunk |
//! | [`corpus_dims`](Store::corpus_dims) | Dimensionality shared by stored embeddings |

pub mod memory;
pub mod sqlite;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::{RagError, Result};
use crate::models::{Chunk, Document};

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

/// An embedded chunk plus the document fields ranking filters and hits need.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingCandidate {
    pub chunk: Chunk,
    pub document_title: String,
    pub course_id: Option<String>,
    pub category: Option<String>,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn upsert_document(&self, doc: &Document) -> Result<()>;

    async fn get_document(&self, id: &str) -> Result<Option<Document>>;

    /// Delete every chunk of `document_id` and insert `chunks`, as one unit.
    ///
    /// Readers see either the old set or the new one. Fails with
    /// [`RagError::DimensionMismatch`] if the new embeddings disagree with
    /// each other or with the rest of the corpus.
    async fn replace_chunks(&self, document_id: &str, chunks: &[Chunk]) -> Result<()>;

    /// [`upsert_document`](Store::upsert_document) plus
    /// [`replace_chunks`](Store::replace_chunks) in one step. When the chunks
    /// are rejected neither the record nor the chunk set changes.
    async fn replace_document(&self, doc: &Document, chunks: &[Chunk]) -> Result<()>;

    async fn list_chunks(&self, document_id: &str) -> Result<Vec<Chunk>>;

    /// All chunks that have an embedding, in storage order.
    async fn ranking_candidates(&self) -> Result<Vec<RankingCandidate>>;

    /// Raw lexical relevance (see [`crate::lexical`]) keyed by chunk id.
    /// Chunks without a match are absent.
    ///
    /// Fails with [`RagError::Infrastructure`] when the backend has no
    /// full-text operator.
    async fn lexical_relevance(&self, query_text: &str) -> Result<HashMap<String, f64>>;

    /// Dimensionality of stored embeddings, `None` for an empty corpus.
    async fn corpus_dims(&self) -> Result<Option<usize>>;
}

/// Common length of the embeddings in `chunks`, checked against `corpus`.
pub(crate) fn check_chunk_dims(chunks: &[Chunk], corpus: Option<usize>) -> Result<Option<usize>> {
    let mut dims = corpus;
    for chunk in chunks {
        let Some(embedding) = &chunk.embedding else {
            continue;
        };
        match dims {
            None => dims = Some(embedding.len()),
            Some(expected) if expected != embedding.len() => {
                return Err(RagError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                })
            }
            Some(_) => {}
        }
    }
    Ok(dims)
}
