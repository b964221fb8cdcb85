//! Text chunking module
//!
//! Splits extracted document text into overlapping, bounded-size chunks
//! for embedding. Splitting prefers natural boundaries (paragraph, then
//! sentence, then word) before falling back to a hard character cut, so
//! retrieval units stay coherent. Sizes and overlap are counted in
//! characters.

use docuchat_common::config::ChunkingSettings;
use tracing::debug;

/// Split document text into chunks
///
/// Guarantees:
/// - every chunk is at most `chunk_size` characters
/// - text of at most `chunk_size` characters comes back as a single
///   chunk equal to the input
/// - consecutive chunks overlap by `chunk_overlap` characters (less when
///   a boundary cut shortened the previous chunk)
/// - no chunk is empty or whitespace-only
/// - identical input yields an identical chunk sequence
///
/// Empty or whitespace-only input yields no chunks; the ingestion
/// pipeline treats that as an unusable document.
pub fn chunk_text(text: &str, settings: &ChunkingSettings) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();

    if total <= settings.chunk_size {
        return vec![text.to_string()];
    }

    // Overlap must leave room to advance
    let overlap = settings
        .chunk_overlap
        .min(settings.chunk_size.saturating_sub(1));

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < total {
        let window_end = (start + settings.chunk_size).min(total);
        let window: String = chars[start..window_end].iter().collect();

        let chunk = if window_end < total {
            split_at_boundary(window)
        } else {
            window
        };
        let chunk_len = chunk.chars().count();

        if !chunk.trim().is_empty() {
            chunks.push(chunk);
        }

        if window_end >= total {
            break;
        }

        start += chunk_len.saturating_sub(overlap).max(1);
    }

    debug!(
        input_len = total,
        chunk_count = chunks.len(),
        chunk_size = settings.chunk_size,
        chunk_overlap = settings.chunk_overlap,
        "Text chunked"
    );

    chunks
}

/// Shorten a window to the best natural boundary in its trailing portion
///
/// Searches the last two fifths of the window for a paragraph break,
/// then a sentence end, then any whitespace. Returns the window as-is
/// when no boundary is found (hard cut).
fn split_at_boundary(window: String) -> String {
    let mut search_start = (window.len() * 3) / 5;
    while search_start > 0 && !window.is_char_boundary(search_start) {
        search_start -= 1;
    }
    let region = &window[search_start..];

    if let Some(pos) = region.rfind("\n\n") {
        return window[..search_start + pos + 2].to_string();
    }

    let sentence_endings = [". ", "! ", "? ", ".\n", "!\n", "?\n"];
    for ending in sentence_endings {
        if let Some(pos) = region.rfind(ending) {
            return window[..search_start + pos + ending.len()].to_string();
        }
    }

    if let Some(pos) = region.rfind(char::is_whitespace) {
        let ws_len = region[pos..]
            .chars()
            .next()
            .map(char::len_utf8)
            .unwrap_or(1);
        return window[..search_start + pos + ws_len].to_string();
    }

    window
}
