//! Ingestion pipeline orchestration.
//!
//! extract → chunk → embed (batched) → atomic document replacement.
//!
//! Embeddings are computed before the store is touched, and the document
//! record is written together with its chunks, so a failing embedder or a
//! rejected chunk set leaves the store exactly as it was.

use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::chunk::{chunk_text, classify, into_chunks, Strategy};
use crate::config::Config;
use crate::embedding::{embed_batched, TextEmbedder};
use crate::error::{ExtractError, Result};
use crate::extract::extract_path;
use crate::models::{ContentKind, Document};
use crate::store::Store;

#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Reuse an id to replace a previously ingested document.
    pub document_id: Option<String>,
    pub course_id: Option<String>,
    pub category: Option<String>,
    /// Defaults to the file stem.
    pub title: Option<String>,
    /// Chunk only; nothing is embedded or written.
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub document_id: String,
    pub title: String,
    pub kind: ContentKind,
    pub strategy: &'static str,
    pub chunks: usize,
    /// Chunks the document had before this run.
    pub replaced: usize,
    pub dry_run: bool,
}

fn strategy_label(strategy: Strategy) -> &'static str {
    match strategy {
        Strategy::Prose => "prose",
        Strategy::Code(Some(lang)) => lang.name(),
        Strategy::Code(None) => crate::chunk::languages::PLAIN,
    }
}

/// Extract `path` and ingest its text.
pub async fn ingest_path(
    store: &dyn Store,
    embedder: &dyn TextEmbedder,
    config: &Config,
    path: &Path,
    opts: &IngestOptions,
) -> Result<IngestReport> {
    let (text, kind) = extract_path(path)?;
    let source = path.to_string_lossy();
    ingest_text(store, embedder, config, &source, &text, kind, opts).await
}

/// Ingest already-extracted text. `source_name` drives strategy selection.
pub async fn ingest_text(
    store: &dyn Store,
    embedder: &dyn TextEmbedder,
    config: &Config,
    source_name: &str,
    text: &str,
    kind: ContentKind,
    opts: &IngestOptions,
) -> Result<IngestReport> {
    if text.trim().is_empty() {
        return Err(ExtractError::Empty(source_name.to_string()).into());
    }

    let strategy = classify(source_name, opts.category.as_deref());
    let segments = chunk_text(text, strategy, &config.chunking);
    if segments.is_empty() {
        return Err(ExtractError::Empty(source_name.to_string()).into());
    }
    debug!(
        source = source_name,
        strategy = strategy_label(strategy),
        segments = segments.len(),
        "chunked"
    );

    let document_id = opts
        .document_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let title = opts.title.clone().unwrap_or_else(|| {
        Path::new(source_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| source_name.to_string())
    });

    let mut chunks = into_chunks(&document_id, segments);

    let mut report = IngestReport {
        document_id: document_id.clone(),
        title: title.clone(),
        kind,
        strategy: strategy_label(strategy),
        chunks: chunks.len(),
        replaced: 0,
        dry_run: opts.dry_run,
    };
    if opts.dry_run {
        return Ok(report);
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embed_batched(embedder, &texts, config.embedding.batch_size).await?;
    for (chunk, vector) in chunks.iter_mut().zip(vectors) {
        chunk.embedding = Some(vector);
    }

    let existing = store.get_document(&document_id).await?;
    report.replaced = match &existing {
        Some(_) => store.list_chunks(&document_id).await?.len(),
        None => 0,
    };

    let doc = Document {
        id: document_id.clone(),
        course_id: opts.course_id.clone(),
        category: opts.category.clone(),
        title,
        source_path: source_name.to_string(),
        kind,
        created_at: existing
            .map(|d| d.created_at)
            .unwrap_or_else(|| Utc::now().timestamp()),
    };
    store.replace_document(&doc, &chunks).await?;

    info!(
        document_id = %document_id,
        chunks = chunks.len(),
        replaced = report.replaced,
        model = embedder.model_name(),
        "ingested document"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::DisabledEmbedder;
    use crate::error::RagError;
    use crate::store::InMemoryStore;
    use async_trait::async_trait;

    struct LengthEmbedder;

    #[async_trait]
    impl TextEmbedder for LengthEmbedder {
        fn model_name(&self) -> &str {
            "length"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }
    }

    fn opts(id: &str) -> IngestOptions {
        IngestOptions {
            document_id: Some(id.to_string()),
            course_id: Some("cs101".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_ingest_writes_embedded_chunks() {
        let store = InMemoryStore::new();
        let config = Config::minimal();
        let report = ingest_text(
            &store,
            &LengthEmbedder,
            &config,
            "notes/week1.md",
            "## Intro\nhello\n## Next\nworld",
            ContentKind::Text,
            &opts("doc-1"),
        )
        .await
        .unwrap();

        assert_eq!(report.title, "week1");
        assert_eq!(report.strategy, "prose");
        let chunks = store.list_chunks("doc-1").await.unwrap();
        assert_eq!(chunks.len(), report.chunks);
        assert!(chunks.iter().all(|c| c.embedding.is_some()));
    }

    #[tokio::test]
    async fn test_failed_embedding_keeps_previous_chunks() {
        let store = InMemoryStore::new();
        let config = Config::minimal();
        ingest_text(&store, &LengthEmbedder, &config, "a.md", "first version", ContentKind::Text, &opts("d"))
            .await
            .unwrap();

        let err = ingest_text(&store, &DisabledEmbedder, &config, "a.md", "second version", ContentKind::Text, &opts("d"))
            .await
            .unwrap_err();
        assert!(err.is_configuration());

        let chunks = store.list_chunks("d").await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "first version");
    }

    #[tokio::test]
    async fn test_reingest_reports_replaced_count() {
        let store = InMemoryStore::new();
        let config = Config::minimal();
        ingest_text(&store, &LengthEmbedder, &config, "a.md", "v1", ContentKind::Text, &opts("d"))
            .await
            .unwrap();
        let report = ingest_text(&store, &LengthEmbedder, &config, "a.md", "v2", ContentKind::Text, &opts("d"))
            .await
            .unwrap();
        assert_eq!(report.replaced, 1);
        assert_eq!(store.list_chunks("d").await.unwrap()[0].text, "v2");
    }

    struct WideEmbedder;

    #[async_trait]
    impl TextEmbedder for WideEmbedder {
        fn model_name(&self) -> &str {
            "wide"
        }
        fn dims(&self) -> usize {
            3
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0]).collect())
        }
    }

    #[tokio::test]
    async fn test_rejected_chunks_leave_no_document_behind() {
        let store = InMemoryStore::new();
        let config = Config::minimal();
        ingest_text(&store, &LengthEmbedder, &config, "a.md", "first", ContentKind::Text, &opts("a"))
            .await
            .unwrap();

        let err = ingest_text(&store, &WideEmbedder, &config, "b.md", "second", ContentKind::Text, &opts("b"))
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 2, actual: 3 }));
        assert!(store.get_document("b").await.unwrap().is_none());

        let mut renamed = opts("a");
        renamed.title = Some("Renamed".into());
        renamed.course_id = Some("cs202".into());
        ingest_text(&store, &LengthEmbedder, &config, "c.md", "other", ContentKind::Text, &opts("c"))
            .await
            .unwrap();
        let err = ingest_text(&store, &WideEmbedder, &config, "a.md", "third", ContentKind::Text, &renamed)
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { .. }));
        let doc = store.get_document("a").await.unwrap().unwrap();
        assert_eq!(doc.title, "a");
        assert_eq!(doc.course_id.as_deref(), Some("cs101"));
        assert_eq!(store.list_chunks("a").await.unwrap()[0].text, "first");
    }

    #[tokio::test]
    async fn test_blank_text_is_rejected() {
        let store = InMemoryStore::new();
        let err = ingest_text(&store, &LengthEmbedder, &Config::minimal(), "x.txt", " \n\t", ContentKind::Text, &opts("d"))
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Extraction(ExtractError::Empty(_))));
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let store = InMemoryStore::new();
        let mut o = opts("d");
        o.dry_run = true;
        let report = ingest_text(&store, &DisabledEmbedder, &Config::minimal(), "lab.py", "def f():\n    return 1\n", ContentKind::Text, &o)
            .await
            .unwrap();
        assert_eq!(report.strategy, "python");
        assert_eq!(store.chunk_count(), 0);
        assert!(store.get_document("d").await.unwrap().is_none());
    }
}
