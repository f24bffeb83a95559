//! Text normalization shared by equality checks, tokenization and detection.

use crate::options::TextContent;

/// Collapse every whitespace run to one space and trim both ends.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Compare two optional values under the active text behavior.
///
/// Under `Normalize`, a missing value and a whitespace-only value are the same.
pub fn values_equal(a: Option<&str>, b: Option<&str>, mode: TextContent) -> bool {
    match mode {
        TextContent::Strict => a == b,
        TextContent::Normalize => {
            let a = a.map(normalize_whitespace).unwrap_or_default();
            let b = b.map(normalize_whitespace).unwrap_or_default();
            a == b
        }
    }
}

/// Word tokens of a value, after normalization when asked for.
pub fn words(s: &str, mode: TextContent) -> impl Iterator<Item = &str> {
    // Strict keeps surrounding punctuation verbatim.
    s.split_whitespace()
        .map(move |w| match mode {
            TextContent::Strict => w,
            TextContent::Normalize => w.trim_matches(|c: char| c.is_ascii_punctuation()),
        })
        .filter(|w| !w.is_empty())
}
