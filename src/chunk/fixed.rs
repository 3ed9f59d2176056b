//! Fixed-width windows with overlap.
//!
//! Lengths and offsets are counted in `char`s. The window always moves
//! forward by at least one character, so any `(max_chars, overlap)` pair
//! terminates, including `overlap >= max_chars` and `max_chars == 0`.

/// Char-offset windows `[start, end)` over a text of `len` chars.
///
/// Consecutive windows touch or overlap, the first starts at 0 and the last
/// ends at `len`, so together they cover the text without gaps.
pub fn window_spans(len: usize, max_chars: usize, overlap: usize) -> Vec<(usize, usize)> {
    let width = max_chars.max(1);
    let mut spans = Vec::new();
    let mut start = 0;
    while start < len {
        let end = (start + width).min(len);
        spans.push((start, end));
        if end >= len {
            break;
        }
        start = end.saturating_sub(overlap).max(start + 1);
    }
    spans
}

/// Split `text` into trimmed, non-empty windows.
///
/// The input is trimmed first; whitespace-only input yields no pieces.
pub fn chunk_fixed(text: &str, max_chars: usize, overlap: usize) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    // Byte offset of every char, plus the end, so spans slice in O(1).
    let mut offsets: Vec<usize> = trimmed.char_indices().map(|(i, _)| i).collect();
    offsets.push(trimmed.len());
    let len = offsets.len() - 1;

    window_spans(len, max_chars, overlap)
        .into_iter()
        .filter_map(|(s, e)| {
            let piece = trimmed[offsets[s]..offsets[e]].trim();
            (!piece.is_empty()).then(|| piece.to_string())
        })
        .collect()
}
