//! Explanation extraction.

use scraper::Html;

use super::{char_len, contains_any, Cascade};

const EXPLANATION_BLOCKS: Cascade = Cascade::new(&[
    ".explanation",
    ".solution",
    ".discussion",
    ".answer-explanation",
    ".comment-content",
    ".discussion-content",
]);

const BASIC_EXPLANATION_BLOCKS: Cascade = Cascade::new(&[
    ".explanation",
    ".solution",
    ".discussion",
    ".answer-explanation",
]);

const PARAGRAPHS: Cascade = Cascade::new(&["p"]);

/// Words that suggest a paragraph is reasoning about the answer.
const REASONING_WORDS: &[&str] = &[
    "because",
    "therefore",
    "thus",
    "hence",
    "explanation",
    "reason",
];

const MIN_BLOCK_LEN: usize = 50;
const MIN_REASONING_LEN: usize = 100;
const BASIC_MIN_BLOCK_LEN: usize = 20;

/// Every explanation block longer than 50 characters, joined by a space.
///
/// When no block qualifies, paragraphs longer than 100 characters that use
/// reasoning words are joined instead.
pub fn explanation(document: &Html) -> Option<String> {
    let blocks = EXPLANATION_BLOCKS.all(document, |text| char_len(text) > MIN_BLOCK_LEN);
    if !blocks.is_empty() {
        return Some(blocks.join(" "));
    }

    let reasoning = PARAGRAPHS.all(document, |text| {
        char_len(text) > MIN_REASONING_LEN && contains_any(&text.to_lowercase(), REASONING_WORDS)
    });
    if reasoning.is_empty() {
        None
    } else {
        Some(reasoning.join(" "))
    }
}

/// The first explanation block longer than 20 characters.
pub fn basic_explanation(document: &Html) -> Option<String> {
    BASIC_EXPLANATION_BLOCKS.first(document, |text| char_len(text) > BASIC_MIN_BLOCK_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG_A: &str = "Azure Policy enforces rules across subscriptions at scale.";
    const LONG_B: &str = "Blueprints package policies with role assignments and templates.";

    #[test]
    fn test_blocks_joined_in_selector_order() {
        let html = Html::parse_document(&format!(
            r#"<body>
                <div class="solution">{LONG_B}</div>
                <div class="explanation">{LONG_A}</div>
                <div class="explanation">too short</div>
            </body>"#
        ));
        assert_eq!(explanation(&html), Some(format!("{LONG_A} {LONG_B}")));
    }

    #[test]
    fn test_reasoning_paragraph_fallback() {
        let reasoning = "Glacier Deep Archive is the right choice because it has the lowest \
                         storage price of every S3 class and retrieval within 12 hours is fine.";
        let html = Html::parse_document(&format!(
            "<body><p>Short note because.</p><p>{reasoning}</p></body>"
        ));
        assert_eq!(explanation(&html).as_deref(), Some(reasoning));
    }

    #[test]
    fn test_long_paragraph_without_reasoning_words_is_ignored() {
        let filler = "x".repeat(150);
        let html = Html::parse_document(&format!("<body><p>{filler}</p></body>"));
        assert_eq!(explanation(&html), None);
    }

    #[test]
    fn test_basic_takes_first_block() {
        let html = Html::parse_document(
            r#"<body>
                <div class="discussion">Most people voted for answer C here.</div>
                <div class="explanation">Use managed identities for this.</div>
            </body>"#,
        );
        assert_eq!(
            basic_explanation(&html).as_deref(),
            Some("Use managed identities for this.")
        );
    }
}
