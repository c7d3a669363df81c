//! Core data types for scrape targets and question records.

use serde::{Deserialize, Serialize};

/// Placeholder written for `question_text` when no candidate qualified.
pub const QUESTION_TEXT_NOT_FOUND: &str = "Question text not found";
/// Placeholder written for `correct_answer` when no candidate qualified.
pub const CORRECT_ANSWER_NOT_FOUND: &str = "Correct answer not found";
/// Placeholder written for `explanation` when no candidate qualified.
pub const EXPLANATION_NOT_FOUND: &str = "Explanation not found";
/// Author and timestamp recorded for discussion comments.
pub const UNKNOWN_COMMENT_FIELD: &str = "Unknown";

/// One unit of scrape work: a page plus the identifiers it is filed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub topic: String,
    pub question: String,
    pub link: String,
}

impl Target {
    pub fn new(
        topic: impl Into<String>,
        question: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            question: question.into(),
            link: link.into(),
        }
    }
}

/// Result of a text extractor.
///
/// `NotFound` means extraction was attempted and nothing qualified. It only
/// becomes a placeholder string at the serialization boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Extracted {
    Found(String),
    #[default]
    NotFound,
}

impl Extracted {
    pub fn from_option(text: Option<String>) -> Self {
        text.map_or(Self::NotFound, Self::Found)
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn as_deref(&self) -> Option<&str> {
        match self {
            Self::Found(text) => Some(text),
            Self::NotFound => None,
        }
    }

    /// Render for external consumers, substituting `sentinel` for a miss.
    pub fn to_text(&self, sentinel: &str) -> String {
        self.as_deref().unwrap_or(sentinel).to_string()
    }

    /// Inverse of [`Extracted::to_text`].
    ///
    /// Page text that is byte-identical to the sentinel reads back as a miss.
    pub fn from_text(text: String, sentinel: &str) -> Self {
        if text == sentinel {
            Self::NotFound
        } else {
            Self::Found(text)
        }
    }
}

/// A discussion comment attached to a question page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
    pub author: String,
    pub timestamp: String,
}

impl Comment {
    pub fn anonymous(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            author: UNKNOWN_COMMENT_FIELD.to_string(),
            timestamp: UNKNOWN_COMMENT_FIELD.to_string(),
        }
    }
}

/// Structured output of scraping one [`Target`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RecordWire", into = "RecordWire")]
pub struct QuestionRecord {
    pub topic: String,
    pub question_number: String,
    pub url: String,
    pub question_text: Extracted,
    pub options: Vec<String>,
    pub correct_answer: Extracted,
    pub explanation: Extracted,
    pub images: Vec<String>,
    pub discussion_comments: Vec<Comment>,
    pub vote_count: u32,
    pub is_premium: bool,
    pub tags: Vec<String>,
    pub difficulty: String,
}

impl QuestionRecord {
    /// An empty record carrying only the target's identifiers.
    pub fn for_target(target: &Target) -> Self {
        Self {
            topic: target.topic.clone(),
            question_number: target.question.clone(),
            url: target.link.clone(),
            question_text: Extracted::NotFound,
            options: Vec::new(),
            correct_answer: Extracted::NotFound,
            explanation: Extracted::NotFound,
            images: Vec::new(),
            discussion_comments: Vec::new(),
            vote_count: 0,
            is_premium: false,
            tags: Vec::new(),
            difficulty: String::new(),
        }
    }

    /// True when no content field holds anything beyond its default.
    pub fn is_empty(&self) -> bool {
        !self.question_text.is_found()
            && self.options.is_empty()
            && !self.correct_answer.is_found()
            && !self.explanation.is_found()
            && self.images.is_empty()
            && self.discussion_comments.is_empty()
            && self.vote_count == 0
            && !self.is_premium
    }
}

/// Serialized shape of a [`QuestionRecord`], with placeholders for misses.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RecordWire {
    topic: String,
    question_number: String,
    url: String,
    question_text: String,
    #[serde(default, deserialize_with = "crate::export::list_or_pipe")]
    options: Vec<String>,
    correct_answer: String,
    explanation: String,
    #[serde(default, deserialize_with = "crate::export::list_or_pipe")]
    images: Vec<String>,
    #[serde(default)]
    discussion_comments: Vec<Comment>,
    #[serde(default)]
    vote_count: u32,
    #[serde(default)]
    is_premium: bool,
    #[serde(default, deserialize_with = "crate::export::list_or_pipe")]
    tags: Vec<String>,
    #[serde(default)]
    difficulty: String,
}

impl From<QuestionRecord> for RecordWire {
    fn from(r: QuestionRecord) -> Self {
        Self {
            question_text: r.question_text.to_text(QUESTION_TEXT_NOT_FOUND),
            correct_answer: r.correct_answer.to_text(CORRECT_ANSWER_NOT_FOUND),
            explanation: r.explanation.to_text(EXPLANATION_NOT_FOUND),
            topic: r.topic,
            question_number: r.question_number,
            url: r.url,
            options: r.options,
            images: r.images,
            discussion_comments: r.discussion_comments,
            vote_count: r.vote_count,
            is_premium: r.is_premium,
            tags: r.tags,
            difficulty: r.difficulty,
        }
    }
}

impl From<RecordWire> for QuestionRecord {
    fn from(w: RecordWire) -> Self {
        Self {
            question_text: Extracted::from_text(w.question_text, QUESTION_TEXT_NOT_FOUND),
            correct_answer: Extracted::from_text(w.correct_answer, CORRECT_ANSWER_NOT_FOUND),
            explanation: Extracted::from_text(w.explanation, EXPLANATION_NOT_FOUND),
            topic: w.topic,
            question_number: w.question_number,
            url: w.url,
            options: w.options,
            images: w.images,
            discussion_comments: w.discussion_comments,
            vote_count: w.vote_count,
            is_premium: w.is_premium,
            tags: w.tags,
            difficulty: w.difficulty,
        }
    }
}

/// Errors that can occur while fetching, scraping, or managing jobs.
#[derive(thiserror::Error, Debug)]
pub enum HarvestError {
    #[error("Fetch failed for {url} after {attempts} attempts")]
    Fetch { url: String, attempts: u32 },

    #[error("Content rejected for {url}: {reason}")]
    ContentRejected { url: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Job not completed: {0}")]
    JobNotCompleted(String),

    #[error("Too many running jobs (limit {0})")]
    TooManyJobs(usize),

    #[error("Job setup failed: {0}")]
    Setup(String),

    #[error("Scrape error: {0}")]
    Scrape(String),

    #[error("Config error: {0}")]
    Config(String),
}

/// Convenience result type.
pub type HarvestResult<T> = Result<T, HarvestError>;
