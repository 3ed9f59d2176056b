//! In-memory [`Store`] for tests and embedding in other programs.
//!
//! Documents and chunks live behind one `parking_lot::RwLock`, so a chunk
//! swap is a single write-guarded step. Lexical relevance is computed with
//! [`phrase_rank`](crate::lexical::phrase_rank) over every stored chunk.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{check_chunk_dims, RankingCandidate, Store};
use crate::error::{RagError, Result};
use crate::lexical::phrase_rank;
use crate::models::{Chunk, Document};

#[derive(Default)]
struct Inner {
    docs: HashMap<String, Document>,
    /// Storage order: insertion order of the current chunk sets.
    chunks: Vec<Chunk>,
}

impl Inner {
    fn check_dims(&self, document_id: &str, chunks: &[Chunk]) -> Result<()> {
        let others = self
            .chunks
            .iter()
            .filter(|c| c.document_id != document_id)
            .find_map(|c| c.embedding.as_ref().map(|e| e.len()));
        check_chunk_dims(chunks, others)?;
        Ok(())
    }

    fn swap_chunks(&mut self, document_id: &str, chunks: &[Chunk]) {
        self.chunks.retain(|c| c.document_id != document_id);
        self.chunks.extend(chunks.iter().cloned());
    }
}

pub struct InMemoryStore {
    inner: RwLock<Inner>,
    lexical: bool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            lexical: true,
        }
    }

    /// A store whose lexical operator is unavailable, like a SQLite build
    /// without FTS5.
    pub fn without_lexical() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            lexical: false,
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.inner.read().chunks.len()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn upsert_document(&self, doc: &Document) -> Result<()> {
        self.inner.write().docs.insert(doc.id.clone(), doc.clone());
        Ok(())
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.inner.read().docs.get(id).cloned())
    }

    async fn replace_chunks(&self, document_id: &str, chunks: &[Chunk]) -> Result<()> {
        let mut inner = self.inner.write();
        inner.check_dims(document_id, chunks)?;
        inner.swap_chunks(document_id, chunks);
        Ok(())
    }

    async fn replace_document(&self, doc: &Document, chunks: &[Chunk]) -> Result<()> {
        let mut inner = self.inner.write();
        inner.check_dims(&doc.id, chunks)?;
        inner.docs.insert(doc.id.clone(), doc.clone());
        inner.swap_chunks(&doc.id, chunks);
        Ok(())
    }

    async fn list_chunks(&self, document_id: &str) -> Result<Vec<Chunk>> {
        let inner = self.inner.read();
        let mut chunks: Vec<Chunk> = inner
            .chunks
            .iter()
            .filter(|c| c.document_id == document_id)
            .cloned()
            .collect();
        chunks.sort_by_key(|c| c.chunk_index);
        Ok(chunks)
    }

    async fn ranking_candidates(&self) -> Result<Vec<RankingCandidate>> {
        let inner = self.inner.read();
        Ok(inner
            .chunks
            .iter()
            .filter(|c| c.embedding.is_some())
            .map(|c| {
                let doc = inner.docs.get(&c.document_id);
                RankingCandidate {
                    chunk: c.clone(),
                    document_title: doc.map(|d| d.title.clone()).unwrap_or_default(),
                    course_id: doc.and_then(|d| d.course_id.clone()),
                    category: doc.and_then(|d| d.category.clone()),
                }
            })
            .collect())
    }

    async fn lexical_relevance(&self, query_text: &str) -> Result<HashMap<String, f64>> {
        if !self.lexical {
            return Err(RagError::Infrastructure(
                "in-memory store configured without a lexical operator".to_string(),
            ));
        }
        let inner = self.inner.read();
        Ok(inner
            .chunks
            .iter()
            .filter_map(|c| {
                let raw = phrase_rank(query_text, &c.text);
                (raw > 0.0).then(|| (c.id.clone(), raw))
            })
            .collect())
    }

    async fn corpus_dims(&self) -> Result<Option<usize>> {
        Ok(self
            .inner
            .read()
            .chunks
            .iter()
            .find_map(|c| c.embedding.as_ref().map(|e| e.len())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentKind;

    fn doc(id: &str) -> Document {
        Document {
            id: id.into(),
            course_id: Some("cs101".into()),
            category: Some("theory".into()),
            title: format!("Title {}", id),
            source_path: format!("{}.md", id),
            kind: ContentKind::Text,
            created_at: 0,
        }
    }

    fn chunk(doc: &str, index: i64, text: &str, embedding: Option<Vec<f32>>) -> Chunk {
        Chunk {
            id: Chunk::make_id(doc, index),
            document_id: doc.into(),
            chunk_index: index,
            text: text.into(),
            language: None,
            symbol_name: None,
            start_line: None,
            end_line: None,
            hash: crate::models::sha256_hex(text),
            embedding,
        }
    }

    #[tokio::test]
    async fn test_replace_swaps_whole_set() {
        let store = InMemoryStore::new();
        store.upsert_document(&doc("a")).await.unwrap();
        store
            .replace_chunks("a", &[chunk("a", 0, "one", None), chunk("a", 1, "two", None)])
            .await
            .unwrap();
        store
            .replace_chunks("a", &[chunk("a", 0, "three", None)])
            .await
            .unwrap();

        let chunks = store.list_chunks("a").await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "three");
    }

    #[tokio::test]
    async fn test_candidates_skip_unembedded_and_carry_document_fields() {
        let store = InMemoryStore::new();
        store.upsert_document(&doc("a")).await.unwrap();
        store
            .replace_chunks(
                "a",
                &[
                    chunk("a", 0, "embedded", Some(vec![1.0, 0.0])),
                    chunk("a", 1, "not embedded", None),
                ],
            )
            .await
            .unwrap();

        let candidates = store.ranking_candidates().await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].document_title, "Title a");
        assert_eq!(candidates[0].course_id.as_deref(), Some("cs101"));
        assert_eq!(store.corpus_dims().await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_dimension_mismatch_across_documents() {
        let store = InMemoryStore::new();
        store
            .replace_chunks("a", &[chunk("a", 0, "x", Some(vec![1.0, 0.0]))])
            .await
            .unwrap();
        let err = store
            .replace_chunks("b", &[chunk("b", 0, "y", Some(vec![1.0, 0.0, 0.0]))])
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 2, actual: 3 }));

        // Re-ingesting the only document may change dimensionality.
        store
            .replace_chunks("a", &[chunk("a", 0, "x", Some(vec![1.0, 0.0, 0.0]))])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_rejected_replace_document_writes_nothing() {
        let store = InMemoryStore::new();
        store
            .replace_document(&doc("a"), &[chunk("a", 0, "x", Some(vec![1.0, 0.0]))])
            .await
            .unwrap();

        let err = store
            .replace_document(&doc("b"), &[chunk("b", 0, "y", Some(vec![1.0, 0.0, 0.0]))])
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 2, actual: 3 }));
        assert!(store.get_document("b").await.unwrap().is_none());
        assert_eq!(store.chunk_count(), 1);
    }

    #[tokio::test]
    async fn test_lexical_relevance() {
        let store = InMemoryStore::new();
        store
            .replace_chunks(
                "a",
                &[
                    chunk("a", 0, "merge sort splits the array", None),
                    chunk("a", 1, "nothing relevant", None),
                ],
            )
            .await
            .unwrap();
        let scores = store.lexical_relevance("merge sort").await.unwrap();
        assert_eq!(scores.len(), 1);
        assert!(scores["a#0"] > 0.0);
    }

    #[tokio::test]
    async fn test_without_lexical_is_infrastructure_error() {
        let store = InMemoryStore::without_lexical();
        let err = store.lexical_relevance("anything").await.unwrap_err();
        assert!(err.is_infrastructure());
    }
}
