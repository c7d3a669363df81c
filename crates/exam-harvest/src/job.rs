//! Job record and its lifecycle transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{QuestionRecord, Target};

/// Highest progress a running job can report; 100 is reserved for terminal states.
pub const MAX_RUNNING_PROGRESS: u8 = 99;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Running)
    }
}

/// Final output of a completed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub data: Vec<QuestionRecord>,
    pub total_questions: usize,
    /// Targets that failed inside the pipeline and have no record.
    pub skipped: usize,
    pub category: String,
    pub exam_code: String,
}

/// One scrape job as observers see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub category: String,
    pub exam_code: String,
    pub targets: Vec<Target>,
    pub status: JobStatus,
    pub progress: u8,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub result: Option<JobResult>,
    pub error: Option<String>,
}

impl Job {
    pub fn new(job_id: String, category: String, exam_code: String, targets: Vec<Target>) -> Self {
        Self {
            job_id,
            category,
            exam_code,
            targets,
            status: JobStatus::Running,
            progress: 0,
            start_time: Utc::now(),
            end_time: None,
            result: None,
            error: None,
        }
    }

    /// Raise progress while running. Never lowers it and never reaches 100.
    pub fn advance(&mut self, progress: u8) {
        if self.status == JobStatus::Running {
            self.progress = self.progress.max(progress.min(MAX_RUNNING_PROGRESS));
        }
    }

    /// `running -> completed`. Returns false if the job was already terminal.
    pub fn complete(&mut self, records: Vec<QuestionRecord>, skipped: usize) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.end_time = Some(Utc::now());
        self.result = Some(JobResult {
            total_questions: records.len(),
            data: records,
            skipped,
            category: self.category.clone(),
            exam_code: self.exam_code.clone(),
        });
        true
    }

    /// `running -> failed`. Returns false if the job was already terminal.
    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = JobStatus::Failed;
        self.progress = 100;
        self.end_time = Some(Utc::now());
        self.error = Some(error.into());
        true
    }
}
