//! Sequential batch runner over a list of targets.
//!
//! Targets are scraped strictly in input order. A target whose scrape returns
//! an error or panics is logged and left out; the loop moves on. Partial
//! results are checkpointed every N processed targets without blocking.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::checkpoint::Checkpointer;
use crate::page::QuestionSource;
use crate::types::{QuestionRecord, Target};

/// Progress notifications from [`BatchRunner::run`].
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    Scraped {
        index: usize,
        question: String,
        progress: u8,
    },
    Skipped {
        index: usize,
        question: String,
        error: String,
        progress: u8,
    },
    CheckpointScheduled {
        records: usize,
        path: String,
    },
}

/// A target that produced no record.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedTarget {
    pub index: usize,
    pub target: Target,
    pub error: String,
}

/// Everything a run produced.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// One record per target that did not fail, in input order.
    pub records: Vec<QuestionRecord>,
    pub skipped: Vec<SkippedTarget>,
    /// True when the run stopped early on cancellation.
    pub cancelled: bool,
}

/// Drives a [`QuestionSource`] over a list of targets.
pub struct BatchRunner {
    source: Arc<dyn QuestionSource>,
    checkpoints: Option<(Arc<Checkpointer>, usize)>,
    cancel: CancellationToken,
}

impl BatchRunner {
    pub fn new(source: Arc<dyn QuestionSource>) -> Self {
        Self {
            source,
            checkpoints: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Snapshot accumulated records every `every` processed targets.
    pub fn with_checkpoints(mut self, checkpointer: Arc<Checkpointer>, every: usize) -> Self {
        self.checkpoints = Some((checkpointer, every.max(1)));
        self
    }

    /// Stop before the next target once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub async fn run<F>(&self, targets: &[Target], mut on_event: F) -> BatchOutcome
    where
        F: FnMut(BatchEvent) + Send,
    {
        let total = targets.len();
        let mut outcome = BatchOutcome {
            records: Vec::with_capacity(total),
            ..Default::default()
        };
        let mut pending = Vec::new();

        for (index, target) in targets.iter().enumerate() {
            let attempt = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                result = AssertUnwindSafe(self.source.scrape(target)).catch_unwind() => Some(result),
            };
            let Some(attempt) = attempt else {
                info!(processed = index, total, "batch cancelled");
                outcome.cancelled = true;
                break;
            };

            let progress = percent(index + 1, total);
            match attempt {
                Ok(Ok(record)) => {
                    outcome.records.push(record);
                    on_event(BatchEvent::Scraped {
                        index,
                        question: target.question.clone(),
                        progress,
                    });
                }
                Ok(Err(e)) => {
                    let error = e.to_string();
                    warn!(index, question = %target.question, %error, "skipping target");
                    outcome.skipped.push(SkippedTarget {
                        index,
                        target: target.clone(),
                        error: error.clone(),
                    });
                    on_event(BatchEvent::Skipped {
                        index,
                        question: target.question.clone(),
                        error,
                        progress,
                    });
                }
                Err(panic) => {
                    let error = format!("scrape panicked: {}", panic_message(panic.as_ref()));
                    warn!(index, question = %target.question, %error, "skipping target");
                    outcome.skipped.push(SkippedTarget {
                        index,
                        target: target.clone(),
                        error: error.clone(),
                    });
                    on_event(BatchEvent::Skipped {
                        index,
                        question: target.question.clone(),
                        error,
                        progress,
                    });
                }
            }

            if let Some((checkpointer, every)) = &self.checkpoints {
                if (index + 1) % every == 0 {
                    pending.push(checkpointer.schedule(outcome.records.clone()));
                    on_event(BatchEvent::CheckpointScheduled {
                        records: outcome.records.len(),
                        path: checkpointer.path().display().to_string(),
                    });
                }
            }
        }

        for handle in pending {
            match handle.await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!(error = %e, "checkpoint write failed"),
                Err(e) => warn!(error = %e, "checkpoint task failed"),
            }
        }

        outcome
    }
}

/// `completed / total` as a rounded percentage; an empty batch is done.
pub fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (completed.min(total) as f64 / total as f64 * 100.0).round();
    pct as u8
}

/// The `[start, end)` slice of `targets`, clamped to its bounds.
pub fn select_range(targets: &[Target], start: Option<usize>, end: Option<usize>) -> &[Target] {
    let len = targets.len();
    let end = end.unwrap_or(len).min(len);
    let start = start.unwrap_or(0).min(end);
    &targets[start..end]
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
