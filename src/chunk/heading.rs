//! Heading-aware chunking for prose.
//!
//! Level-2 and level-3 markdown headings open a new section. Sections are
//! then merged left to right while the merged text stays under the merge
//! threshold. Text with no heading falls back to fixed-width windows.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::fixed::chunk_fixed;
use crate::config::ChunkingConfig;

static HEADING: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?m)^#{2,3}[ \t]").ok());

const SECTION_JOIN: &str = "\n\n";

/// Byte offsets at which a heading line starts.
fn heading_offsets(text: &str) -> Vec<usize> {
    match HEADING.as_ref() {
        Some(re) => re.find_iter(text).map(|m| m.start()).collect(),
        None => Vec::new(),
    }
}

/// Split at heading lines. Each section keeps its heading; text before the
/// first heading is its own section. Sections are trimmed and blanks dropped.
pub fn split_sections(text: &str, starts: &[usize]) -> Vec<String> {
    let mut bounds = Vec::with_capacity(starts.len() + 2);
    bounds.push(0);
    bounds.extend(starts.iter().copied().filter(|&s| s > 0));
    bounds.push(text.len());

    bounds
        .windows(2)
        .filter_map(|w| {
            let section = text[w[0]..w[1]].trim();
            (!section.is_empty()).then(|| section.to_string())
        })
        .collect()
}

/// Greedy forward merge: a section joins the accumulator while the merged
/// length stays strictly under `threshold` chars.
pub fn merge_sections(sections: Vec<String>, threshold: usize) -> Vec<String> {
    let mut merged = Vec::new();
    let mut acc = String::new();
    let mut acc_len = 0;

    for section in sections {
        let len = section.chars().count();
        if acc.is_empty() {
            acc = section;
            acc_len = len;
        } else if acc_len + SECTION_JOIN.len() + len < threshold {
            acc.push_str(SECTION_JOIN);
            acc.push_str(&section);
            acc_len += SECTION_JOIN.len() + len;
        } else {
            merged.push(std::mem::take(&mut acc));
            acc = section;
            acc_len = len;
        }
    }
    if !acc.is_empty() {
        merged.push(acc);
    }
    merged
}

/// Chunk prose by headings, or by fixed-width windows when there are none.
pub fn chunk_headings(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let starts = heading_offsets(text);
    if starts.is_empty() {
        debug!("no headings found, using fixed-width windows");
        return chunk_fixed(text, config.max_chars, config.overlap);
    }

    let sections = split_sections(text, &starts);
    let count = sections.len();
    let merged = merge_sections(sections, config.heading_merge_chars);
    debug!(sections = count, chunks = merged.len(), "heading chunking");
    merged
}
