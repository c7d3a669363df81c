//! Correct-answer extraction.

use scraper::Html;

use super::{char_len, contains_any, Cascade};

/// Phrases that mark an element as stating the answer.
const ANSWER_INDICATORS: &[&str] = &[
    "correct answer",
    "correct option",
    "right answer",
    "answer is",
    "correct choice",
    "correct:",
    "answer:",
];

const INDICATOR_CANDIDATES: Cascade = Cascade::new(&["p, div, span, strong, b"]);

const ANSWER_BLOCKS: Cascade =
    Cascade::new(&[".correct-answer", ".answer", ".solution", ".explanation"]);

const MIN_BLOCK_LEN: usize = 5;

/// First element whose text mentions an answer indicator, verbatim; else the
/// first answer-block class with more than five characters.
pub fn correct_answer(document: &Html) -> Option<String> {
    INDICATOR_CANDIDATES
        .first(document, |text| {
            contains_any(&text.to_lowercase(), ANSWER_INDICATORS)
        })
        .or_else(|| ANSWER_BLOCKS.first(document, |text| char_len(text) > MIN_BLOCK_LEN))
}

/// Answer-block classes only; the text has to say "correct" or "answer".
pub fn basic_correct_answer(document: &Html) -> Option<String> {
    ANSWER_BLOCKS.first(document, |text| {
        contains_any(&text.to_lowercase(), &["correct", "answer"])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indicator_text_is_kept_verbatim() {
        let html = Html::parse_document(
            r#"<body>
                <p>Some discussion first.</p>
                <p>The Correct Answer is B. Use an Application Gateway.</p>
            </body>"#,
        );
        assert_eq!(
            correct_answer(&html).as_deref(),
            Some("The Correct Answer is B. Use an Application Gateway.")
        );
    }

    #[test]
    fn test_falls_back_to_answer_block() {
        let html = Html::parse_document(
            r#"<body><section class="solution">Option C, then D</section></body>"#,
        );
        assert_eq!(correct_answer(&html).as_deref(), Some("Option C, then D"));
    }

    #[test]
    fn test_short_answer_block_is_ignored() {
        let html = Html::parse_document(r#"<body><section class="answer">B</section></body>"#);
        assert_eq!(correct_answer(&html), None);
    }

    #[test]
    fn test_basic_requires_keyword() {
        let html = Html::parse_document(
            r#"<body>
                <section class="solution">Option C, then D</section>
                <section class="answer">Answer: C</section>
            </body>"#,
        );
        assert_eq!(basic_correct_answer(&html).as_deref(), Some("Answer: C"));
    }
}
