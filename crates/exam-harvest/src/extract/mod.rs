//! Extraction pipeline over a parsed question page.
//!
//! Each extractor is an independent, infallible heuristic that recovers one
//! field of a [`QuestionRecord`]. Most are driven by a [`Cascade`]: an ordered
//! list of CSS selectors walked in selector order, then document order, until
//! a candidate's text satisfies the field's predicate.

pub mod answer;
pub mod discussion;
pub mod explanation;
pub mod media;
pub mod options;
pub mod question;

use std::fmt;
use std::str::FromStr;

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use crate::fetch::Document;
use crate::types::{Extracted, QuestionRecord};

/// Which extractor set and heuristics to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionProfile {
    /// All eight extractors with the discussion-page heuristics.
    #[default]
    Advanced,
    /// Question text, options, answer, explanation and images only.
    Basic,
}

impl ExtractionProfile {
    pub fn default_checkpoint_every(self) -> usize {
        match self {
            Self::Advanced => 5,
            Self::Basic => 10,
        }
    }
}

impl fmt::Display for ExtractionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Advanced => write!(f, "advanced"),
            Self::Basic => write!(f, "basic"),
        }
    }
}

impl FromStr for ExtractionProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "advanced" => Ok(Self::Advanced),
            "basic" => Ok(Self::Basic),
            other => Err(format!("unknown extraction profile '{other}'")),
        }
    }
}

/// Run every extractor of `profile` over `document`, filling `record`.
pub fn extract_into(record: &mut QuestionRecord, document: &Document, profile: ExtractionProfile) {
    let html = document.parse();
    let page_url = document.url.as_str();

    match profile {
        ExtractionProfile::Advanced => {
            record.question_text = Extracted::from_option(question::question_text(&html));
            record.options = options::options(&html);
            record.correct_answer = Extracted::from_option(answer::correct_answer(&html));
            record.explanation = Extracted::from_option(explanation::explanation(&html));
            record.images = media::content_images(&html, page_url);
            record.discussion_comments = discussion::comments(&html);
            record.vote_count = discussion::vote_count(&html);
            record.is_premium = discussion::is_premium(&html);
        }
        ExtractionProfile::Basic => {
            record.question_text = Extracted::from_option(question::basic_question_text(&html));
            record.options = options::basic_options(&html);
            record.correct_answer = Extracted::from_option(answer::basic_correct_answer(&html));
            record.explanation = Extracted::from_option(explanation::basic_explanation(&html));
            record.images = media::all_images(&html, page_url);
        }
    }
}

/// Visible text of an element: each text node trimmed, empty ones dropped,
/// the rest concatenated without separators.
pub fn element_text(el: &ElementRef<'_>) -> String {
    el.text().map(str::trim).filter(|s| !s.is_empty()).collect()
}

/// All text of the document, lowercased.
pub(crate) fn page_text_lower(document: &Html) -> String {
    document.root_element().text().collect::<String>().to_lowercase()
}

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

pub(crate) fn contains_any(haystack_lower: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack_lower.contains(n))
}

/// An ordered list of CSS selectors evaluated until a candidate qualifies.
#[derive(Debug, Clone, Copy)]
pub struct Cascade {
    patterns: &'static [&'static str],
}

impl Cascade {
    pub const fn new(patterns: &'static [&'static str]) -> Self {
        Self { patterns }
    }

    /// Text of the first element accepted by `accept`.
    pub fn first(&self, document: &Html, accept: impl Fn(&str) -> bool) -> Option<String> {
        self.texts(document).find(|text| accept(text))
    }

    /// Texts of every element accepted by `accept`, in cascade order.
    pub fn all(&self, document: &Html, accept: impl Fn(&str) -> bool) -> Vec<String> {
        self.texts(document).filter(|text| accept(text)).collect()
    }

    /// Matching elements in cascade order.
    pub fn elements<'a>(&self, document: &'a Html) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        let selectors: Vec<Selector> = self
            .patterns
            .iter()
            .filter_map(|p| Selector::parse(p).ok())
            .collect();
        selectors.into_iter().flat_map(move |sel| {
            document.select(&sel).collect::<Vec<_>>()
        })
    }

    fn texts<'a>(&self, document: &'a Html) -> impl Iterator<Item = String> + 'a {
        self.elements(document).map(|el| element_text(&el))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Target;

    fn doc(url: &str, html: &str) -> Document {
        Document {
            url: url.to_string(),
            final_url: url.to_string(),
            html: html.to_string(),
        }
    }

    #[test]
    fn test_element_text_strips_and_joins() {
        let html = Html::parse_fragment("<p>  Which service \n <b> stores </b> objects? </p>");
        let sel = Selector::parse("p").unwrap();
        let p = html.select(&sel).next().unwrap();
        assert_eq!(element_text(&p), "Which servicestoresobjects?");
    }

    #[test]
    fn test_cascade_respects_selector_order() {
        let html = Html::parse_document(
            "<body><p class='b'>second selector</p><p class='a'>first selector</p></body>",
        );
        let cascade = Cascade::new(&[".a", ".b"]);
        assert_eq!(cascade.first(&html, |_| true).as_deref(), Some("first selector"));
        assert_eq!(
            cascade.all(&html, |_| true),
            vec!["first selector".to_string(), "second selector".to_string()]
        );
    }

    #[test]
    fn test_cascade_skips_invalid_selectors() {
        let html = Html::parse_document("<h1>Heading</h1>");
        let cascade = Cascade::new(&["[[", "h1"]);
        assert_eq!(cascade.first(&html, |_| true).as_deref(), Some("Heading"));
    }

    #[test]
    fn test_profile_parse_and_display() {
        assert_eq!("Basic".parse::<ExtractionProfile>(), Ok(ExtractionProfile::Basic));
        assert_eq!(ExtractionProfile::Advanced.to_string(), "advanced");
        assert!("fancy".parse::<ExtractionProfile>().is_err());
    }

    #[test]
    fn test_unmatched_page_leaves_defaults() {
        let target = Target::new("1", "1", "https://ok.test/q/1");
        let mut record = QuestionRecord::for_target(&target);
        extract_into(
            &mut record,
            &doc("https://ok.test/q/1", "<html><head><title>Q</title></head><body></body></html>"),
            ExtractionProfile::Advanced,
        );
        assert_eq!(record.question_text, Extracted::NotFound);
        assert!(record.options.is_empty());
        assert_eq!(record.vote_count, 0);
        assert!(!record.is_premium);
        assert!(record.is_empty());
    }

    #[test]
    fn test_basic_profile_skips_discussion_fields() {
        let html = r#"<html><body>
            <h1>Which storage class is cheapest for archival data?</h1>
            <div class="comment"><p>I think Glacier Deep Archive is right.</p></div>
            <span class="votes">12 votes</span>
            <p>Upgrade to premium for more.</p>
        </body></html>"#;
        let target = Target::new("1", "2", "https://ok.test/q/2");
        let mut record = QuestionRecord::for_target(&target);
        extract_into(&mut record, &doc("https://ok.test/q/2", html), ExtractionProfile::Basic);

        assert!(record.question_text.is_found());
        assert!(record.discussion_comments.is_empty());
        assert_eq!(record.vote_count, 0);
        assert!(!record.is_premium);
    }
}
