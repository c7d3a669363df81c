//! exam-harvest: resilient question-page scraping with background jobs.
//!
//! Pages are fetched with retry and backoff, run through a cascade of
//! extraction heuristics, collected into batches with periodic checkpoints,
//! and managed as jobs whose progress can be polled or streamed.

pub mod batch;
pub mod catalog;
pub mod checkpoint;
pub mod config;
pub mod events;
pub mod export;
pub mod extract;
pub mod fetch;
pub mod input;
pub mod job;
pub mod manager;
pub mod page;
pub mod report;
pub mod types;

pub use batch::{percent, select_range, BatchEvent, BatchOutcome, BatchRunner, SkippedTarget};
pub use catalog::{CatalogCategory, ExamCatalog};
pub use checkpoint::Checkpointer;
pub use config::ScraperConfig;
pub use events::{EventBus, JobEvent};
pub use export::{flatten, read_csv, to_csv, write_csv, FlatQuestionRecord};
pub use extract::ExtractionProfile;
pub use fetch::{Document, Fetcher};
pub use input::load_targets;
pub use job::{Job, JobResult, JobStatus};
pub use manager::JobManager;
pub use page::{PageScraper, QuestionSource};
pub use report::SummaryReport;
pub use types::{
    Comment, Extracted, HarvestError, HarvestResult, QuestionRecord, Target,
    CORRECT_ANSWER_NOT_FOUND, EXPLANATION_NOT_FOUND, QUESTION_TEXT_NOT_FOUND,
};
