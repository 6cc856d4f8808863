#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{LessonError, Result};

/// A bounded contiguous slice of source text, the retrieval granularity unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The chunk text
    pub text: String,
    /// Ordinal position within the source
    pub index: usize,
}

/// Configuration for text chunking, all sizes in characters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target window size
    pub chunk_size: usize,
    /// Overlap carried between consecutive chunks
    pub chunk_overlap: usize,
    /// Lower bound for every chunk except a trailing remainder
    pub chunk_min: usize,
    /// Upper bound for every chunk
    pub chunk_max: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 160,
            chunk_min: 600,
            chunk_max: 1000,
        }
    }
}

/// How far back from the hard cut a paragraph or sentence break may be
/// and still be preferred over a hard character cut.
const SNAP_WINDOW: usize = 80;

/// Split normalized text into overlapping, bounded-size chunks.
///
/// Every emitted chunk except possibly the last satisfies
/// `chunk_min <= len <= chunk_max`; text shorter than the window yields a
/// single chunk with the bounds relaxed.
#[inline]
pub fn make_chunks(text: &str, config: &ChunkingConfig) -> Result<Vec<Chunk>> {
    let text = normalize(text);

    if text.is_empty() {
        return Err(LessonError::EmptyInput(
            "text is blank after normalization".to_string(),
        ));
    }

    if text.len() <= config.chunk_size {
        return Ok(vec![Chunk { text, index: 0 }]);
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let hard_end = floor_char_boundary(&text, (start + config.chunk_size).min(text.len()));
        let end = if hard_end == text.len() {
            hard_end
        } else {
            snap_cut(&text, start, hard_end, config)
        };

        chunks.push(Chunk {
            text: slice(&text, start, end).to_string(),
            index: chunks.len(),
        });

        if end == text.len() {
            break;
        }

        // chunk_overlap < chunk_min, so the overlapped start normally stays
        // ahead of the previous one; fall back to a clean cut if boundary
        // clamping ever eats the whole step
        let next = floor_char_boundary(&text, end.saturating_sub(config.chunk_overlap));
        start = if next > start { next } else { end };
    }

    debug!(
        "Chunked {} characters into {} chunks (size {}, overlap {})",
        text.len(),
        chunks.len(),
        config.chunk_size,
        config.chunk_overlap
    );

    Ok(chunks)
}

fn normalize(text: &str) -> String {
    text.replace("\r\n", "\n").trim().to_string()
}

/// Find the cut position for a window ending at `hard_end`, preferring a
/// paragraph break, then a sentence end, inside the trailing snap window.
fn snap_cut(text: &str, start: usize, hard_end: usize, config: &ChunkingConfig) -> usize {
    let floor = ceil_char_boundary(
        text,
        (start + config.chunk_min).max(hard_end.saturating_sub(SNAP_WINDOW)),
    );

    if floor >= hard_end {
        return hard_end;
    }

    let window = slice(text, floor, hard_end);

    if let Some(pos) = window.rfind("\n\n") {
        return floor + pos + 2;
    }

    let mut sentence_cut = None;
    for (pos, ch) in window.char_indices() {
        if matches!(ch, '.' | '!' | '?') {
            let after = floor + pos + ch.len_utf8();
            if slice(text, after, text.len())
                .chars()
                .next()
                .is_some_and(char::is_whitespace)
            {
                sentence_cut = Some(after);
            }
        }
    }

    sentence_cut.unwrap_or(hard_end)
}

#[expect(
    clippy::string_slice,
    reason = "all offsets are clamped to char boundaries before slicing"
)]
fn slice(text: &str, start: usize, end: usize) -> &str {
    &text[start..end]
}

fn floor_char_boundary(text: &str, mut pos: usize) -> usize {
    while pos > 0 && !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

fn ceil_char_boundary(text: &str, mut pos: usize) -> usize {
    while pos < text.len() && !text.is_char_boundary(pos) {
        pos += 1;
    }
    pos
}
