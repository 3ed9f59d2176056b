//! Document text → retrieval units.
//!
//! The strategy is chosen per document by [`classify`]:
//!
//! | Input | Strategy |
//! |-------|----------|
//! | known code extension (`.py`, `.rs`, `.go`, …) | [`code::chunk_code`] at declaration boundaries |
//! | `lab` category, other extension | [`code::chunk_plain`], fixed-width windows tagged `plain` |
//! | anything else | [`heading::chunk_headings`], falling back to fixed-width windows |
//!
//! All strategies are pure and deterministic; empty or whitespace-only text
//! yields no segments. [`into_chunks`] assigns contiguous indices from 0,
//! deterministic ids, and SHA-256 hashes.

pub mod code;
pub mod fixed;
pub mod heading;
pub mod languages;

use std::path::Path;

use crate::config::ChunkingConfig;
use crate::models::{sha256_hex, Chunk, Segment};

pub use languages::Language;

/// Category that marks lab material.
pub const LAB_CATEGORY: &str = "lab";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Prose,
    /// `None` means code without boundary rules (`plain`).
    Code(Option<Language>),
}

/// Pick a chunking strategy from the source file name and category.
pub fn classify(source_name: &str, category: Option<&str>) -> Strategy {
    let language = Path::new(source_name)
        .extension()
        .and_then(|e| e.to_str())
        .and_then(Language::from_extension);

    match language {
        Some(lang) => Strategy::Code(Some(lang)),
        None if category.is_some_and(|c| c.eq_ignore_ascii_case(LAB_CATEGORY)) => {
            Strategy::Code(None)
        }
        None => Strategy::Prose,
    }
}

/// Split `text` with the given strategy.
pub fn chunk_text(text: &str, strategy: Strategy, config: &ChunkingConfig) -> Vec<Segment> {
    match strategy {
        Strategy::Prose => heading::chunk_headings(text, config)
            .into_iter()
            .map(Segment::prose)
            .collect(),
        Strategy::Code(Some(lang)) => code::chunk_code(text, lang, config),
        Strategy::Code(None) => code::chunk_plain(text, config),
    }
}

/// Attach ids, indices and hashes. Indices are contiguous from 0.
pub fn into_chunks(document_id: &str, segments: Vec<Segment>) -> Vec<Chunk> {
    segments
        .into_iter()
        .enumerate()
        .map(|(i, seg)| {
            let index = i as i64;
            Chunk {
                id: Chunk::make_id(document_id, index),
                document_id: document_id.to_string(),
                chunk_index: index,
                hash: sha256_hex(&seg.text),
                text: seg.text,
                language: seg.language,
                symbol_name: seg.symbol_name,
                start_line: seg.start_line.map(|l| l as i64),
                end_line: seg.end_line.map(|l| l as i64),
                embedding: None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(
            classify("lab1/main.py", Some("theory")),
            Strategy::Code(Some(Language::Python))
        );
        assert_eq!(classify("lab1.txt", Some("lab")), Strategy::Code(None));
        assert_eq!(classify("lab1.txt", Some("LAB")), Strategy::Code(None));
        assert_eq!(classify("week1.pdf", Some("theory")), Strategy::Prose);
        assert_eq!(classify("README", None), Strategy::Prose);
    }

    #[test]
    fn test_prose_segments_have_no_code_metadata() {
        let segments = chunk_text("## A\nalpha\n## B\nbeta", Strategy::Prose, &ChunkingConfig::default());
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].language, None);
        assert_eq!(segments[0].start_line, None);
    }

    #[test]
    fn test_into_chunks_indices_and_ids() {
        let segments = vec![Segment::prose("one"), Segment::prose("two")];
        let chunks = into_chunks("doc", segments);
        assert_eq!(chunks.len(), 2);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i as i64);
            assert_eq!(c.id, format!("doc#{}", i));
            assert_eq!(c.hash, sha256_hex(&c.text));
            assert!(c.embedding.is_none());
        }
    }

    #[test]
    fn test_deterministic() {
        let text = "## Intro\nSome words here.\n## Next\nMore words.";
        let config = ChunkingConfig::default();
        let a = into_chunks("d", chunk_text(text, Strategy::Prose, &config));
        let b = into_chunks("d", chunk_text(text, Strategy::Prose, &config));
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        let config = ChunkingConfig::default();
        for strategy in [Strategy::Prose, Strategy::Code(None), Strategy::Code(Some(Language::Go))] {
            assert!(chunk_text("", strategy, &config).is_empty());
            assert!(chunk_text(" \n ", strategy, &config).is_empty());
        }
    }
}
