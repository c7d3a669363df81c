//! exam-harvest server: REST surface and CLI plumbing over the job manager.

pub mod rest;

use std::sync::Arc;
use std::time::Instant;

use exam_harvest::JobManager;

/// State shared by every request handler.
pub struct AppState {
    pub manager: Arc<JobManager>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(manager: JobManager) -> Arc<Self> {
        Arc::new(Self {
            manager: Arc::new(manager),
            started_at: Instant::now(),
        })
    }
}

pub use rest::{router, start};
