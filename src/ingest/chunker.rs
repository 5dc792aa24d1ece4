//! Word-window chunker
//!
//! Splits text on whitespace and groups the words into consecutive,
//! non-overlapping windows of a fixed size. The final window may be shorter.

use std::num::NonZeroUsize;

/// Default window size in words
pub const DEFAULT_CHUNK_SIZE: usize = 300;

/// Split `text` into windows of `size` words each
///
/// Words inside a window are joined by a single space. Empty or
/// whitespace-only input yields no windows.
pub fn chunk_text(text: &str, size: NonZeroUsize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();

    words
        .chunks(size.get())
        .map(|window| window.join(" "))
        .collect()
}
