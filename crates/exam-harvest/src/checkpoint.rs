//! Periodic snapshots of a batch's partial results.
//!
//! Snapshots are written from spawned tasks so the scrape loop never waits
//! on disk. Each snapshot carries a sequence number; a write that loses the
//! race to a newer snapshot is dropped, so the file only ever moves forward.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::types::{HarvestError, HarvestResult, QuestionRecord};

/// Writes `progress_<name>.json` snapshots into one directory.
#[derive(Debug)]
pub struct Checkpointer {
    path: PathBuf,
    next_seq: AtomicU64,
    last_written: Arc<Mutex<u64>>,
}

impl Checkpointer {
    /// Prepare checkpointing into `dir`, creating it if needed.
    pub async fn create(dir: &Path, name: &str) -> HarvestResult<Self> {
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            HarvestError::Setup(format!(
                "cannot create checkpoint directory {}: {e}",
                dir.display()
            ))
        })?;
        Ok(Self {
            path: dir.join(checkpoint_file_name(name)),
            next_seq: AtomicU64::new(0),
            last_written: Arc::new(Mutex::new(0)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `records` in the background.
    ///
    /// The task resolves to `true` when the snapshot landed and `false` when a
    /// newer snapshot had already been written.
    pub fn schedule(&self, records: Vec<QuestionRecord>) -> JoinHandle<HarvestResult<bool>> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let path = self.path.clone();
        let last_written = Arc::clone(&self.last_written);
        tokio::spawn(async move { write_snapshot(&path, seq, &last_written, &records).await })
    }

    /// Read a snapshot back.
    pub async fn load(path: &Path) -> HarvestResult<Vec<QuestionRecord>> {
        let raw = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&raw)?)
    }
}

/// `progress_<name>.json`, with path separators and other odd characters
/// replaced so the name cannot escape the checkpoint directory.
pub fn checkpoint_file_name(name: &str) -> String {
    let stem = name.strip_suffix(".json").unwrap_or(name);
    let safe: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("progress_{safe}.json")
}

async fn write_snapshot(
    path: &Path,
    seq: u64,
    last_written: &Mutex<u64>,
    records: &[QuestionRecord],
) -> HarvestResult<bool> {
    let mut last = last_written.lock().await;
    if *last >= seq {
        debug!(path = %path.display(), seq, "skipping stale checkpoint");
        return Ok(false);
    }

    let bytes = serde_json::to_vec_pretty(records)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    *last = seq;

    debug!(path = %path.display(), seq, records = records.len(), "checkpoint written");
    Ok(true)
}
