//! Discussion-thread signals: comments, votes, and the premium marker.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{Html, Selector};

use super::{char_len, contains_any, element_text, page_text_lower, Cascade};
use crate::types::Comment;

const COMMENT_CONTAINERS: Cascade =
    Cascade::new(&[".comment", ".discussion-comment", ".reply", ".post"]);

const VOTE_CONTAINERS: Cascade = Cascade::new(&[".votes", ".vote-count", ".rating", ".score"]);

const PREMIUM_MARKERS: &[&str] = &["premium", "paid", "subscribe", "upgrade"];

const MIN_COMMENT_LEN: usize = 10;

fn digits() -> Option<&'static Regex> {
    static DIGITS: OnceLock<Option<Regex>> = OnceLock::new();
    DIGITS.get_or_init(|| Regex::new(r"\d+").ok()).as_ref()
}

/// One comment per container: the text of its first nested `p`, `div` or
/// `span`, kept when longer than ten characters.
pub fn comments(document: &Html) -> Vec<Comment> {
    let Ok(body_sel) = Selector::parse("p, div, span") else {
        return Vec::new();
    };

    COMMENT_CONTAINERS
        .elements(document)
        .filter_map(|container| container.select(&body_sel).next())
        .map(|body| element_text(&body))
        .filter(|text| char_len(text) > MIN_COMMENT_LEN)
        .map(Comment::anonymous)
        .collect()
}

/// First digit run in the first vote element that has one, else 0.
///
/// A run too large for `u32` does not count as a vote.
pub fn vote_count(document: &Html) -> u32 {
    let Some(digits) = digits() else {
        return 0;
    };
    VOTE_CONTAINERS
        .elements(document)
        .find_map(|el| {
            let text = element_text(&el);
            digits.find(&text).and_then(|m| m.as_str().parse().ok())
        })
        .unwrap_or(0)
}

/// Whether the page mentions paid content anywhere.
pub fn is_premium(document: &Html) -> bool {
    contains_any(&page_text_lower(document), PREMIUM_MARKERS)
}
