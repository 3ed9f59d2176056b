//! Structure-aware chunking for source code.
//!
//! Boundaries come from the per-language rule table. Offset 0 is always a
//! boundary; each segment runs from one boundary to the next. Short unnamed
//! segments are dropped as noise. When nothing usable is found the text is
//! split into fixed-width windows without symbol metadata.

use std::collections::BTreeMap;

use tracing::debug;

use super::fixed::chunk_fixed;
use super::languages::{is_keyword, BoundaryKind, Language, PLAIN};
use crate::config::ChunkingConfig;
use crate::models::Segment;

/// A declaration start found by the rule table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary {
    pub offset: usize,
    /// Kind of the rule that produced the boundary; `None` for the implicit
    /// boundary at offset 0.
    pub kind: Option<BoundaryKind>,
    pub symbol: Option<String>,
}

/// Sorted, de-duplicated boundaries, always including offset 0.
///
/// When two rules hit the same offset the first rule wins, except that a
/// later named hit replaces an earlier unnamed one.
pub fn find_boundaries(text: &str, language: Language) -> Vec<Boundary> {
    let mut found: BTreeMap<usize, (Option<BoundaryKind>, Option<String>)> = BTreeMap::new();

    for rule in language.rules() {
        for caps in rule.regex.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            let symbol = caps
                .get(rule.symbol_group)
                .map(|m| m.as_str())
                .filter(|name| !is_keyword(name))
                .map(str::to_string);

            match found.get_mut(&whole.start()) {
                None => {
                    found.insert(whole.start(), (Some(rule.kind), symbol));
                }
                Some(slot) if slot.1.is_none() && symbol.is_some() => {
                    *slot = (Some(rule.kind), symbol);
                }
                Some(_) => {}
            }
        }
    }
    found.entry(0).or_insert((None, None));

    found
        .into_iter()
        .map(|(offset, (kind, symbol))| Boundary {
            offset,
            kind,
            symbol,
        })
        .collect()
}

/// 1-based line lookup over precomputed line-start offsets.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    fn line_of(&self, offset: usize) -> usize {
        self.starts.partition_point(|&s| s <= offset)
    }
}

/// Chunk source code of a known language.
pub fn chunk_code(text: &str, language: Language, config: &ChunkingConfig) -> Vec<Segment> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let boundaries = find_boundaries(text, language);
    let segments = if boundaries.len() > 1 || boundaries[0].symbol.is_some() {
        segments_from_boundaries(text, &boundaries, language, config.min_segment_chars)
    } else {
        Vec::new()
    };

    if segments.is_empty() {
        debug!(language = language.name(), "no code boundaries, using fixed-width windows");
        return fixed_code(text, language.name(), config);
    }
    let types = boundaries
        .iter()
        .filter(|b| b.kind.is_some_and(|k| k.is_type()))
        .count();
    debug!(
        language = language.name(),
        segments = segments.len(),
        types,
        "code chunking"
    );
    segments
}

/// Chunk code with no boundary rules into fixed-width windows.
pub fn chunk_plain(text: &str, config: &ChunkingConfig) -> Vec<Segment> {
    fixed_code(text, PLAIN, config)
}

fn fixed_code(text: &str, language: &str, config: &ChunkingConfig) -> Vec<Segment> {
    chunk_fixed(text, config.code_max_chars, config.code_overlap)
        .into_iter()
        .map(|piece| Segment {
            text: piece,
            language: Some(language.to_string()),
            symbol_name: None,
            start_line: None,
            end_line: None,
        })
        .collect()
}

/// Byte spans `[start, end)` between consecutive boundaries. Together they
/// cover `text` exactly, in order.
pub fn boundary_spans(text: &str, boundaries: &[Boundary]) -> Vec<(usize, usize)> {
    boundaries
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let end = boundaries
                .get(i + 1)
                .map(|next| next.offset)
                .unwrap_or(text.len());
            (b.offset, end)
        })
        .collect()
}

fn segments_from_boundaries(
    text: &str,
    boundaries: &[Boundary],
    language: Language,
    min_chars: usize,
) -> Vec<Segment> {
    let lines = LineIndex::new(text);
    let mut out = Vec::new();

    for (boundary, (start, end)) in boundaries.iter().zip(boundary_spans(text, boundaries)) {
        let raw = &text[start..end];

        let body = raw.trim();
        if body.is_empty() {
            continue;
        }
        if boundary.symbol.is_none() && body.chars().count() < min_chars {
            continue;
        }

        let lead = raw.len() - raw.trim_start().len();
        let first = start + lead;
        let last = first + body.len() - 1;

        out.push(Segment {
            text: body.to_string(),
            language: Some(language.name().to_string()),
            symbol_name: boundary.symbol.clone(),
            start_line: Some(lines.line_of(first)),
            end_line: Some(lines.line_of(last)),
        });
    }
    out
}
