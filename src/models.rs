//! Core data models used throughout the pipeline.
//!
//! These types represent the course documents, chunks, and ranked hits that
//! flow through ingestion and retrieval.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Content kind detected by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Paginated binary document; pages are joined with blank lines.
    Pdf,
    Text,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Pdf => "pdf",
            ContentKind::Text => "text",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pdf" => Some(ContentKind::Pdf),
            "text" => Some(ContentKind::Text),
            _ => None,
        }
    }
}

/// A stored course material record. Chunks belong to exactly one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub course_id: Option<String>,
    /// Free-form category; `lab` material is chunked as code.
    pub category: Option<String>,
    pub title: String,
    pub source_path: String,
    pub kind: ContentKind,
    pub created_at: i64,
}

/// Chunker output before ids, hashes and embeddings are attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub language: Option<String>,
    pub symbol_name: Option<String>,
    /// 1-based, inclusive.
    pub start_line: Option<usize>,
    pub end_line: Option<usize>,
}

impl Segment {
    /// Plain text segment with no code metadata.
    pub fn prose(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: None,
            symbol_name: None,
            start_line: None,
            end_line: None,
        }
    }
}

/// A persisted retrieval unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    pub language: Option<String>,
    pub symbol_name: Option<String>,
    pub start_line: Option<i64>,
    pub end_line: Option<i64>,
    /// SHA-256 hex digest of `text`.
    pub hash: String,
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    /// Deterministic chunk id for a (document, index) pair.
    pub fn make_id(document_id: &str, chunk_index: i64) -> String {
        format!("{}#{}", document_id, chunk_index)
    }
}

pub fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// A ranked search result with provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hit {
    pub chunk_id: String,
    pub document_id: String,
    pub document_title: String,
    pub chunk_index: i64,
    pub category: Option<String>,
    pub language: Option<String>,
    pub symbol_name: Option<String>,
    pub start_line: Option<i64>,
    pub end_line: Option<i64>,
    /// Fused relevance in [0, 1].
    pub score: f64,
    pub vector_score: f64,
    /// Rescaled lexical relevance, present only when the hybrid signal was used.
    pub lexical_score: Option<f64>,
    pub text: String,
    pub excerpt: String,
}

/// Trim `text` and cut it to `max_chars` characters, marking the cut with `…`.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}…", trimmed[..byte_idx].trim_end()),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_is_deterministic() {
        assert_eq!(Chunk::make_id("doc-1", 3), "doc-1#3");
        assert_eq!(Chunk::make_id("doc-1", 3), Chunk::make_id("doc-1", 3));
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_excerpt_truncates_on_char_boundary() {
        assert_eq!(excerpt("  héllo wörld  ", 5), "héllo…");
        assert_eq!(excerpt("short", 700), "short");
        assert_eq!(excerpt("exact", 5), "exact");
        assert_eq!(excerpt("merge sort splits", 11), "merge sort…");
    }

    #[test]
    fn test_content_kind_serde() {
        assert_eq!(serde_json::to_string(&ContentKind::Pdf).unwrap(), "\"pdf\"");
        assert_eq!(ContentKind::parse("text"), Some(ContentKind::Text));
        assert_eq!(ContentKind::parse("docx"), None);
    }
}
