//! Hybrid vector + lexical ranking.
//!
//! For every embedded chunk that passes the filters:
//!
//! ```text
//! vector  = cosine(chunk, query)
//! lexical = min(raw_lexical × multiplier, 1.0)      (hybrid with query text only)
//! score   = clamp(w_v·vector + w_l·lexical, 0, 1)   (or clamp(vector) without lexical)
//! ```
//!
//! Hits are ordered by score descending, then by raw vector similarity, so
//! chunks whose clamped score is 0 still come back in cosine order. The
//! sort is stable; remaining ties keep the store's candidate order. A store that cannot compute lexical
//! relevance fails with [`RagError::Infrastructure`]; the retry policy lives
//! in [`crate::search::rank_with_fallback`].

use std::cmp::Ordering;

use serde::Serialize;
use tracing::debug;

use crate::config::RetrievalConfig;
use crate::embedding::cosine_similarity;
use crate::error::{RagError, Result};
use crate::models::{excerpt, Hit};
use crate::store::{RankingCandidate, Store};

/// Optional, AND-combined candidate filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchFilters {
    pub course_id: Option<String>,
    pub category: Option<String>,
    /// Exact language label, e.g. `python` or `plain`.
    pub language: Option<String>,
    /// Case-insensitive substring of the symbol name.
    pub symbol: Option<String>,
}

impl SearchFilters {
    pub fn matches(&self, candidate: &RankingCandidate) -> bool {
        if let Some(course) = &self.course_id {
            if candidate.course_id.as_deref() != Some(course.as_str()) {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if candidate.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        if let Some(language) = &self.language {
            if candidate.chunk.language.as_deref() != Some(language.as_str()) {
                return false;
            }
        }
        if let Some(symbol) = &self.symbol {
            let needle = symbol.to_lowercase();
            match &candidate.chunk.symbol_name {
                Some(name) if name.to_lowercase().contains(&needle) => {}
                _ => return false,
            }
        }
        true
    }
}

/// One ranking request.
#[derive(Debug, Clone)]
pub struct Query {
    pub embedding: Vec<f32>,
    pub text: Option<String>,
    pub filters: SearchFilters,
    pub top_k: usize,
}

/// Fusion parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankParams {
    pub hybrid: bool,
    pub vector_weight: f64,
    pub lexical_weight: f64,
    pub lexical_multiplier: f64,
    pub excerpt_chars: usize,
}

impl RankParams {
    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self {
            hybrid: config.hybrid,
            vector_weight: config.vector_weight,
            lexical_weight: config.lexical_weight,
            lexical_multiplier: config.lexical_multiplier,
            excerpt_chars: config.excerpt_chars,
        }
    }

    pub fn vector_only(self) -> Self {
        Self {
            hybrid: false,
            ..self
        }
    }
}

impl Default for RankParams {
    fn default() -> Self {
        Self::from_config(&RetrievalConfig::default())
    }
}

/// Rescale a raw lexical value into `[0, 1]`.
pub fn rescale_lexical(raw: f64, multiplier: f64) -> f64 {
    (raw * multiplier).clamp(0.0, 1.0)
}

/// Weighted fusion, clamped to `[0, 1]`. Non-decreasing in both signals.
pub fn fuse(vector: f64, lexical: Option<f64>, params: &RankParams) -> f64 {
    let score = match lexical {
        Some(lex) => params.vector_weight * vector + params.lexical_weight * lex,
        None => vector,
    };
    score.clamp(0.0, 1.0)
}

/// Rank the store's embedded chunks against `query`.
pub async fn rank(store: &dyn Store, query: &Query, params: &RankParams) -> Result<Vec<Hit>> {
    let query_text = query
        .text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());
    let lexical = match query_text {
        Some(text) if params.hybrid => Some(store.lexical_relevance(text).await?),
        _ => None,
    };

    let candidates = store.ranking_candidates().await?;
    let total = candidates.len();

    let mut hits = Vec::new();
    for candidate in candidates {
        if !query.filters.matches(&candidate) {
            continue;
        }
        let Some(embedding) = candidate.chunk.embedding.as_deref() else {
            continue;
        };
        if embedding.len() != query.embedding.len() {
            return Err(RagError::DimensionMismatch {
                expected: embedding.len(),
                actual: query.embedding.len(),
            });
        }

        let vector_score = cosine_similarity(embedding, &query.embedding) as f64;
        let lexical_score = lexical.as_ref().map(|scores| {
            let raw = scores.get(&candidate.chunk.id).copied().unwrap_or(0.0);
            rescale_lexical(raw, params.lexical_multiplier)
        });
        let score = fuse(vector_score, lexical_score, params);

        hits.push(to_hit(candidate, score, vector_score, lexical_score, params.excerpt_chars));
    }

    hits.sort_by(compare_hits);
    hits.truncate(query.top_k);

    debug!(
        candidates = total,
        returned = hits.len(),
        hybrid = lexical.is_some(),
        "ranked"
    );
    Ok(hits)
}

fn compare_hits(a: &Hit, b: &Hit) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            b.vector_score
                .partial_cmp(&a.vector_score)
                .unwrap_or(Ordering::Equal)
        })
}

fn to_hit(
    candidate: RankingCandidate,
    score: f64,
    vector_score: f64,
    lexical_score: Option<f64>,
    excerpt_chars: usize,
) -> Hit {
    let RankingCandidate {
        chunk,
        document_title,
        category,
        ..
    } = candidate;
    Hit {
        excerpt: excerpt(&chunk.text, excerpt_chars),
        chunk_id: chunk.id,
        document_id: chunk.document_id,
        document_title,
        chunk_index: chunk.chunk_index,
        category,
        language: chunk.language,
        symbol_name: chunk.symbol_name,
        start_line: chunk.start_line,
        end_line: chunk.end_line,
        score,
        vector_score,
        lexical_score,
        text: chunk.text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Chunk, ContentKind, Document};
    use crate::store::InMemoryStore;

    fn candidate(symbol: Option<&str>, language: Option<&str>) -> RankingCandidate {
        RankingCandidate {
            chunk: Chunk {
                id: "d#0".into(),
                document_id: "d".into(),
                chunk_index: 0,
                text: "body".into(),
                language: language.map(Into::into),
                symbol_name: symbol.map(Into::into),
                start_line: None,
                end_line: None,
                hash: String::new(),
                embedding: Some(vec![1.0]),
            },
            document_title: "Doc".into(),
            course_id: Some("cs101".into()),
            category: Some("lab".into()),
        }
    }

    #[test]
    fn test_fuse_weights() {
        let p = RankParams::default();
        assert!((fuse(0.5, Some(1.0), &p) - 0.65).abs() < 1e-12);
        assert_eq!(fuse(0.5, None, &p), 0.5);
        assert_eq!(fuse(-0.4, None, &p), 0.0);
        assert_eq!(fuse(1.0, Some(1.0), &p), 1.0);
    }

    #[test]
    fn test_rescale_lexical_clamps() {
        assert!((rescale_lexical(0.1, 5.0) - 0.5).abs() < 1e-12);
        assert_eq!(rescale_lexical(0.3, 5.0), 1.0);
    }

    #[test]
    fn test_filters_and_combine() {
        let c = candidate(Some("parse_Args"), Some("python"));
        let mut f = SearchFilters {
            course_id: Some("cs101".into()),
            category: Some("lab".into()),
            language: Some("python".into()),
            symbol: Some("ARGS".into()),
        };
        assert!(f.matches(&c));
        f.language = Some("rust".into());
        assert!(!f.matches(&c));
    }

    #[test]
    fn test_symbol_filter_requires_symbol() {
        let f = SearchFilters {
            symbol: Some("x".into()),
            ..Default::default()
        };
        assert!(!f.matches(&candidate(None, None)));
        assert!(SearchFilters::default().matches(&candidate(None, None)));
    }

    #[tokio::test]
    async fn test_vector_only_orders_negative_cosines() {
        let store = InMemoryStore::new();
        store
            .upsert_document(&Document {
                id: "d".into(),
                course_id: None,
                category: None,
                title: "D".into(),
                source_path: "d.md".into(),
                kind: ContentKind::Text,
                created_at: 0,
            })
            .await
            .unwrap();
        let mut far = candidate(None, None).chunk;
        far.embedding = Some(vec![-1.0, 0.0]);
        let mut near = far.clone();
        near.id = "d#1".into();
        near.chunk_index = 1;
        near.embedding = Some(vec![-0.2, 1.0]);
        store.replace_chunks("d", &[far, near]).await.unwrap();

        let query = Query {
            embedding: vec![1.0, 0.0],
            text: None,
            filters: SearchFilters::default(),
            top_k: 1,
        };
        let hits = rank(&store, &query, &RankParams::default().vector_only())
            .await
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, "d#1");
        assert_eq!(hits[0].score, 0.0);
        assert!(hits[0].vector_score < 0.0);
    }
}
