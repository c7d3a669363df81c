//! Question text extraction.

use scraper::Html;

use super::{char_len, contains_any, Cascade};

/// Candidates containing any of these are site chrome, not question text.
const NAVIGATION_NOISE: &[&str] = &["home", "login", "register", "search", "menu"];

const QUESTION_CASCADE: Cascade = Cascade::new(&[
    ".discussion-content h1",
    ".discussion-content h2",
    ".discussion-content h3",
    ".discussion-content .question-text",
    ".discussion-content .question-content",
    ".discussion-content p:first-of-type",
    "h1",
    "h2",
    "h3",
    ".discussion-content p",
]);

const BASIC_QUESTION_CASCADE: Cascade = Cascade::new(&[
    ".question-text",
    ".question-content",
    ".discussion-content h1",
    ".discussion-content h2",
    ".discussion-content h3",
    ".discussion-content p",
    "h1",
    "h2",
    "h3",
]);

const PARAGRAPHS: Cascade = Cascade::new(&["p"]);

const MIN_QUESTION_LEN: usize = 30;
const BASIC_MIN_QUESTION_LEN: usize = 20;
const MIN_FALLBACK_PARAGRAPH_LEN: usize = 50;

/// First heading or question block longer than 30 characters that is not
/// navigation, else the first paragraph longer than 50 characters.
pub fn question_text(document: &Html) -> Option<String> {
    QUESTION_CASCADE
        .first(document, |text| {
            char_len(text) > MIN_QUESTION_LEN
                && !contains_any(&text.to_lowercase(), NAVIGATION_NOISE)
        })
        .or_else(|| fallback_paragraph(document))
}

/// Question-block classes first, any candidate longer than 20 characters.
pub fn basic_question_text(document: &Html) -> Option<String> {
    BASIC_QUESTION_CASCADE
        .first(document, |text| char_len(text) > BASIC_MIN_QUESTION_LEN)
        .or_else(|| fallback_paragraph(document))
}

fn fallback_paragraph(document: &Html) -> Option<String> {
    PARAGRAPHS.first(document, |text| char_len(text) > MIN_FALLBACK_PARAGRAPH_LEN)
}
