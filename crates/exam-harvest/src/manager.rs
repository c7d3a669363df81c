//! Job registry and background execution.
//!
//! [`JobManager`] owns every job in a concurrent map. `create` admits a job
//! and spawns one tokio task for it; that task is the only writer of the
//! job's status, progress, and result. Queries clone a job under the map's
//! shard lock, so readers never see a half-applied transition.

use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::batch::{BatchEvent, BatchRunner};
use crate::checkpoint::Checkpointer;
use crate::config::ScraperConfig;
use crate::events::{EventBus, JobEvent};
use crate::job::{Job, JobStatus};
use crate::page::{PageScraper, QuestionSource};
use crate::types::{HarvestError, HarvestResult, QuestionRecord, Target};

struct JobEntry {
    seq: u64,
    job: Job,
    cancel: CancellationToken,
}

type JobTable = Arc<DashMap<String, JobEntry>>;

/// Registry of scrape jobs.
pub struct JobManager {
    jobs: JobTable,
    source: Arc<dyn QuestionSource>,
    config: ScraperConfig,
    events: EventBus,
    counter: AtomicU64,
    admission: Mutex<()>,
}

impl JobManager {
    /// A manager that scrapes live pages as described by `config`.
    pub fn new(config: ScraperConfig) -> HarvestResult<Self> {
        let scraper = PageScraper::from_config(&config)?;
        Ok(Self::with_source(Arc::new(scraper), config))
    }

    /// A manager driving an arbitrary [`QuestionSource`].
    pub fn with_source(source: Arc<dyn QuestionSource>, config: ScraperConfig) -> Self {
        Self {
            jobs: Arc::new(DashMap::new()),
            source,
            config,
            events: EventBus::default(),
            counter: AtomicU64::new(0),
            admission: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Admit a job and start it in the background. Returns its id immediately.
    pub fn create(
        &self,
        category: &str,
        exam_code: &str,
        targets: Vec<Target>,
    ) -> HarvestResult<String> {
        let category = category.trim();
        let exam_code = exam_code.trim();
        if category.is_empty() || exam_code.is_empty() {
            return Err(HarvestError::InvalidRequest(
                "Missing category or exam_code".to_string(),
            ));
        }
        if targets.is_empty() {
            return Err(HarvestError::InvalidRequest("Missing targets".to_string()));
        }

        let (job_id, cancel) = {
            // Hold the admission lock across count and insert so the cap holds.
            let _admit = self
                .admission
                .lock()
                .map_err(|_| HarvestError::Setup("admission lock poisoned".to_string()))?;

            if let Some(limit) = self.config.max_concurrent_jobs {
                if self.running_count() >= limit {
                    warn!(limit, "rejecting job, too many running");
                    return Err(HarvestError::TooManyJobs(limit));
                }
            }

            let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
            let job_id = format!("job_{n}_{}", chrono::Utc::now().timestamp());
            let cancel = CancellationToken::new();
            let job = Job::new(
                job_id.clone(),
                category.to_string(),
                exam_code.to_string(),
                targets.clone(),
            );
            self.jobs.insert(
                job_id.clone(),
                JobEntry {
                    seq: n,
                    job,
                    cancel: cancel.clone(),
                },
            );
            (job_id, cancel)
        };

        info!(%job_id, category, exam_code, targets = targets.len(), "job started");
        self.events.emit(JobEvent::JobStarted {
            job_id: job_id.clone(),
            category: category.to_string(),
            exam_code: exam_code.to_string(),
            total_targets: targets.len(),
        });

        let ctx = JobContext {
            job_id: job_id.clone(),
            targets,
            jobs: Arc::clone(&self.jobs),
            source: Arc::clone(&self.source),
            events: self.events.clone(),
            checkpoint_dir: self.config.resolved_checkpoint_dir(),
            checkpoint_every: self.config.checkpoint_interval(),
            cancel,
        };
        tokio::spawn(async move {
            let jobs = Arc::clone(&ctx.jobs);
            let events = ctx.events.clone();
            let id = ctx.job_id.clone();
            if let Err(panic) = AssertUnwindSafe(run_job(ctx)).catch_unwind().await {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                fail_job(&jobs, &events, &id, format!("job runner panicked: {message}"));
            }
        });

        Ok(job_id)
    }

    pub fn get(&self, job_id: &str) -> HarvestResult<Job> {
        self.jobs
            .get(job_id)
            .map(|entry| entry.job.clone())
            .ok_or_else(|| HarvestError::JobNotFound(job_id.to_string()))
    }

    /// Every job, oldest first.
    pub fn list(&self) -> Vec<Job> {
        let mut entries: Vec<(u64, Job)> = self
            .jobs
            .iter()
            .map(|entry| (entry.seq, entry.job.clone()))
            .collect();
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, job)| job).collect()
    }

    /// Forget a job. A running job's runner stops before its next target.
    pub fn delete(&self, job_id: &str) -> HarvestResult<()> {
        let (_, entry) = self
            .jobs
            .remove(job_id)
            .ok_or_else(|| HarvestError::JobNotFound(job_id.to_string()))?;
        entry.cancel.cancel();

        info!(%job_id, status = ?entry.job.status, "job deleted");
        self.events.emit(JobEvent::JobDeleted {
            job_id: job_id.to_string(),
        });
        Ok(())
    }

    /// Records of a completed job.
    pub fn records_for_download(&self, job_id: &str) -> HarvestResult<Vec<QuestionRecord>> {
        let entry = self
            .jobs
            .get(job_id)
            .ok_or_else(|| HarvestError::JobNotFound(job_id.to_string()))?;
        match (&entry.job.status, &entry.job.result) {
            (JobStatus::Completed, Some(result)) => Ok(result.data.clone()),
            _ => Err(HarvestError::JobNotCompleted(job_id.to_string())),
        }
    }

    pub fn running_count(&self) -> usize {
        self.jobs
            .iter()
            .filter(|entry| entry.job.status == JobStatus::Running)
            .count()
    }
}

struct JobContext {
    job_id: String,
    targets: Vec<Target>,
    jobs: JobTable,
    source: Arc<dyn QuestionSource>,
    events: EventBus,
    checkpoint_dir: PathBuf,
    checkpoint_every: usize,
    cancel: CancellationToken,
}

async fn run_job(ctx: JobContext) {
    let JobContext {
        job_id,
        targets,
        jobs,
        source,
        events,
        checkpoint_dir,
        checkpoint_every,
        cancel,
    } = ctx;

    let checkpointer = match Checkpointer::create(&checkpoint_dir, &job_id).await {
        Ok(c) => Arc::new(c),
        Err(e) => {
            fail_job(&jobs, &events, &job_id, e.to_string());
            return;
        }
    };

    let runner = BatchRunner::new(source)
        .with_checkpoints(checkpointer, checkpoint_every)
        .with_cancellation(cancel);

    let outcome = runner
        .run(&targets, |event| match event {
            BatchEvent::Scraped {
                index,
                question,
                progress,
            } => {
                update_job(&jobs, &job_id, |job| job.advance(progress));
                events.emit(JobEvent::TargetScraped {
                    job_id: job_id.clone(),
                    index,
                    question,
                    progress,
                });
            }
            BatchEvent::Skipped {
                index,
                question,
                error,
                progress,
            } => {
                update_job(&jobs, &job_id, |job| job.advance(progress));
                events.emit(JobEvent::TargetSkipped {
                    job_id: job_id.clone(),
                    index,
                    question,
                    error,
                    progress,
                });
            }
            BatchEvent::CheckpointScheduled { records, path } => {
                events.emit(JobEvent::CheckpointScheduled {
                    job_id: job_id.clone(),
                    records,
                    path,
                });
            }
        })
        .await;

    if outcome.cancelled {
        info!(%job_id, "job runner stopped after deletion");
        return;
    }

    let records = outcome.records.len();
    let skipped = outcome.skipped.len();
    let completed = update_job(&jobs, &job_id, |job| job.complete(outcome.records, skipped));
    if completed == Some(true) {
        info!(%job_id, records, skipped, "job completed");
        events.emit(JobEvent::JobCompleted {
            job_id,
            records,
            skipped,
        });
    }
}

/// Apply `f` to a job if it still exists. Writes to a deleted job are dropped.
fn update_job<R>(jobs: &JobTable, job_id: &str, f: impl FnOnce(&mut Job) -> R) -> Option<R> {
    jobs.get_mut(job_id).map(|mut entry| f(&mut entry.job))
}

fn fail_job(jobs: &JobTable, events: &EventBus, job_id: &str, message: String) {
    error!(%job_id, error = %message, "job failed");
    if update_job(jobs, job_id, |job| job.fail(message.clone())) == Some(true) {
        events.emit(JobEvent::JobFailed {
            job_id: job_id.to_string(),
            error: message,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Extracted;
    use async_trait::async_trait;
    use std::time::Duration;

    struct InstantSource;

    #[async_trait]
    impl QuestionSource for InstantSource {
        async fn scrape(&self, target: &Target) -> HarvestResult<QuestionRecord> {
            let mut record = QuestionRecord::for_target(target);
            record.question_text = Extracted::Found(format!("Q{}", target.question));
            Ok(record)
        }
    }

    /// Never finishes a scrape, keeping its job running.
    struct StuckSource;

    #[async_trait]
    impl QuestionSource for StuckSource {
        async fn scrape(&self, _target: &Target) -> HarvestResult<QuestionRecord> {
            futures::future::pending().await
        }
    }

    fn config(dir: &std::path::Path) -> ScraperConfig {
        ScraperConfig {
            checkpoint_dir: Some(dir.to_path_buf()),
            ..Default::default()
        }
    }

    fn targets(n: usize) -> Vec<Target> {
        (1..=n)
            .map(|i| Target::new("1", i.to_string(), format!("https://q.test/{i}")))
            .collect()
    }

    async fn wait_terminal(manager: &JobManager, job_id: &str) -> Job {
        for _ in 0..200 {
            let job = manager.get(job_id).unwrap();
            if job.status.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {job_id} never finished");
    }

    #[tokio::test]
    async fn test_create_validates_input() {
        let dir = tempfile::tempdir().unwrap();
        let manager = JobManager::with_source(Arc::new(InstantSource), config(dir.path()));

        assert!(matches!(
            manager.create("", "az-104", targets(1)),
            Err(HarvestError::InvalidRequest(_))
        ));
        assert!(matches!(
            manager.create("azure", "  ", targets(1)),
            Err(HarvestError::InvalidRequest(_))
        ));
        assert!(matches!(
            manager.create("azure", "az-104", Vec::new()),
            Err(HarvestError::InvalidRequest(_))
        ));
        assert!(manager.list().is_empty());
    }

    #[tokio::test]
    async fn test_job_runs_to_completion() {
        let dir = tempfile::tempdir().unwrap();
        let manager = JobManager::with_source(Arc::new(InstantSource), config(dir.path()));

        let job_id = manager.create("azure", "az-104", targets(3)).unwrap();
        assert!(job_id.starts_with("job_1_"));

        let job = wait_terminal(&manager, &job_id).await;
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert_eq!(job.result.as_ref().unwrap().total_questions, 3);
        assert_eq!(manager.records_for_download(&job_id).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_list_in_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let manager = JobManager::with_source(Arc::new(StuckSource), config(dir.path()));

        let ids: Vec<String> = (0..5)
            .map(|_| manager.create("aws", "saa-c03", targets(1)).unwrap())
            .collect();
        let listed: Vec<String> = manager.list().into_iter().map(|j| j.job_id).collect();
        assert_eq!(listed, ids);
    }

    #[tokio::test]
    async fn test_download_requires_completion() {
        let dir = tempfile::tempdir().unwrap();
        let manager = JobManager::with_source(Arc::new(StuckSource), config(dir.path()));

        let job_id = manager.create("aws", "saa-c03", targets(2)).unwrap();
        assert!(matches!(
            manager.records_for_download(&job_id),
            Err(HarvestError::JobNotCompleted(_))
        ));
        assert!(matches!(
            manager.records_for_download("job_404_0"),
            Err(HarvestError::JobNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_removes_and_cancels() {
        let dir = tempfile::tempdir().unwrap();
        let manager = JobManager::with_source(Arc::new(StuckSource), config(dir.path()));
        let mut rx = manager.events().subscribe();

        let job_id = manager.create("aws", "saa-c03", targets(2)).unwrap();
        manager.delete(&job_id).unwrap();

        assert!(matches!(manager.get(&job_id), Err(HarvestError::JobNotFound(_))));
        assert!(matches!(manager.delete(&job_id), Err(HarvestError::JobNotFound(_))));
        assert_eq!(manager.running_count(), 0);

        assert!(matches!(rx.recv().await.unwrap(), JobEvent::JobStarted { .. }));
        assert!(matches!(rx.recv().await.unwrap(), JobEvent::JobDeleted { .. }));
    }

    #[tokio::test]
    async fn test_admission_limit() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ScraperConfig {
            max_concurrent_jobs: Some(1),
            ..config(dir.path())
        };
        let manager = JobManager::with_source(Arc::new(StuckSource), cfg);

        let first = manager.create("aws", "saa-c03", targets(1)).unwrap();
        assert!(matches!(
            manager.create("aws", "dva-c02", targets(1)),
            Err(HarvestError::TooManyJobs(1))
        ));

        manager.delete(&first).unwrap();
        assert!(manager.create("aws", "dva-c02", targets(1)).is_ok());
    }

    #[tokio::test]
    async fn test_unwritable_checkpoint_dir_fails_job() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let manager = JobManager::with_source(
            Arc::new(InstantSource),
            config(&blocker.join("checkpoints")),
        );

        let job_id = manager.create("aws", "saa-c03", targets(1)).unwrap();
        let job = wait_terminal(&manager, &job_id).await;
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.progress, 100);
        assert!(job.error.unwrap().contains("checkpoint"));
        assert!(job.result.is_none());
    }
}
