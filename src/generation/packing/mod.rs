#[cfg(test)]
mod tests;

use crate::index::RetrievalHit;

/// Assemble retrieved texts into one bounded context block.
///
/// Snippets are appended in the given order until the next one would
/// exceed `max_chars`, except that the very first non-empty snippet is
/// always included, so any hit list with usable text yields non-empty
/// context. Chunk ids never appear in the output.
#[inline]
pub fn pack_context(hits: &[RetrievalHit], max_chars: usize) -> String {
    let mut lines = vec!["CONTEXT SNIPPETS:".to_string()];
    let mut total = 0;

    for hit in hits {
        let Some(text) = hit.text.as_deref() else {
            continue;
        };
        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        let snippet = format!("{}\n", text);
        if total > 0 && total + snippet.len() > max_chars {
            break;
        }
        total += snippet.len();
        lines.push(snippet);
    }

    lines.join("\n")
}
