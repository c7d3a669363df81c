//! Answer option extraction.

use std::sync::OnceLock;

use regex::Regex;
use scraper::Html;

use super::{char_len, Cascade};

/// Questions never carry more than five options (A through E).
pub const MAX_OPTIONS: usize = 5;

/// Text after the label must be longer than this to count as an option.
const MIN_OPTION_BODY_LEN: usize = 5;

const OPTION_CANDIDATES: Cascade = Cascade::new(&["p, li, div"]);

const BASIC_OPTION_SELECTORS: &[&str] = &[".option", ".answer-option", ".choice", "li", "p"];

const BASIC_LABELS: &[&str] = &["A.", "B.", "C.", "D.", "E."];

/// Leading-label patterns, tried in order: `A.`, `A)`, bare `A`.
fn label_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [r"(?i)^[A-E]\.\s*", r"(?i)^[A-E]\)\s*", r"(?i)^[A-E]\s*"]
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect()
    })
}

/// True if `text` opens with an option label followed by a real body.
pub fn is_option(text: &str) -> bool {
    label_patterns().iter().any(|pattern| {
        pattern
            .find(text)
            .map(|m| char_len(text[m.end()..].trim()) > MIN_OPTION_BODY_LEN)
            .unwrap_or(false)
    })
}

/// Labelled paragraphs, list items and containers in document order, with
/// their labels kept, capped at [`MAX_OPTIONS`].
pub fn options(document: &Html) -> Vec<String> {
    OPTION_CANDIDATES
        .elements(document)
        .map(|el| super::element_text(&el))
        .filter(|text| !text.is_empty() && is_option(text))
        .take(MAX_OPTIONS)
        .collect()
}

/// `X.`-labelled candidates from the first selector that yields any.
pub fn basic_options(document: &Html) -> Vec<String> {
    for pattern in BASIC_OPTION_SELECTORS {
        let found = Cascade::new(std::slice::from_ref(pattern)).all(document, |text| {
            BASIC_LABELS.iter().any(|label| text.starts_with(label))
        });
        if !found.is_empty() {
            return found.into_iter().take(MAX_OPTIONS).collect();
        }
    }
    Vec::new()
}
