//! Lexical relevance on a `ts_rank`-like scale.
//!
//! Raw relevance values live in `[0, RAW_MAX]`. The ranker multiplies them
//! by `retrieval.lexical_multiplier` and clamps to 1.0, so the in-memory
//! [`phrase_rank`] and the SQLite `bm25()` mapping ([`bm25_to_raw`]) are
//! interchangeable.

use std::collections::HashSet;

use unicode_segmentation::UnicodeSegmentation;

/// Upper bound of a raw lexical relevance value.
pub const RAW_MAX: f64 = 0.2;

const COVERAGE_WEIGHT: f64 = 0.1;
const PHRASE_BONUS: f64 = 0.1;

const STOPWORDS: &[&str] = &[
    "a", "about", "an", "and", "are", "as", "at", "be", "been", "but", "by", "can", "do",
    "does", "for", "from", "had", "has", "have", "how", "i", "if", "in", "into", "is", "it",
    "its", "me", "my", "no", "not", "of", "on", "or", "our", "so", "such", "than", "that",
    "the", "their", "them", "then", "there", "these", "they", "this", "to", "was", "we",
    "were", "what", "when", "where", "which", "who", "why", "will", "with", "you", "your",
];

fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

/// Lowercased words with stop words removed, in text order.
pub fn terms(text: &str) -> Vec<String> {
    text.unicode_words()
        .map(|w| w.to_lowercase())
        .filter(|w| !is_stopword(w))
        .collect()
}

/// Relevance of `text` for `query` in `[0, RAW_MAX]`.
///
/// Term coverage (fraction of distinct query terms present) contributes up
/// to half the range; finding the multi-term query as a contiguous phrase
/// adds the other half. No shared term scores 0.
pub fn phrase_rank(query: &str, text: &str) -> f64 {
    let query_terms = terms(query);
    let mut distinct: Vec<&str> = Vec::new();
    for t in &query_terms {
        if !distinct.contains(&t.as_str()) {
            distinct.push(t);
        }
    }
    if distinct.is_empty() {
        return 0.0;
    }

    let doc_terms = terms(text);
    let doc_set: HashSet<&str> = doc_terms.iter().map(|t| t.as_str()).collect();

    let matched = distinct.iter().filter(|t| doc_set.contains(*t)).count();
    if matched == 0 {
        return 0.0;
    }
    let coverage = matched as f64 / distinct.len() as f64;

    let phrase = query_terms.len() >= 2
        && doc_terms
            .windows(query_terms.len())
            .any(|w| w == query_terms.as_slice());

    COVERAGE_WEIGHT * coverage + if phrase { PHRASE_BONUS } else { 0.0 }
}

/// Map an FTS5 `bm25()` value (more negative is better) onto `[0, RAW_MAX)`.
pub fn bm25_to_raw(bm25: f64) -> f64 {
    let s = (-bm25).max(0.0);
    RAW_MAX * s / (s + 1.0)
}

/// FTS5 MATCH expression: each term quoted, OR-combined.
///
/// `None` when the query has no searchable terms.
pub fn fts_match_expr(query: &str) -> Option<String> {
    let mut seen = HashSet::new();
    let parts: Vec<String> = terms(query)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .map(|t| format!("\"{}\"", t.replace('"', "\"\"")))
        .collect();
    (!parts.is_empty()).then(|| parts.join(" OR "))
}
