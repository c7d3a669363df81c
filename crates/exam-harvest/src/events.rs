//! Job event bus.
//!
//! [`EventBus`] is a `tokio::sync::broadcast` channel carrying [`JobEvent`]
//! values from background jobs to any number of observers (the SSE endpoint,
//! CLI progress output, tests). With no subscribers, events are dropped.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Something that happened to a job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JobEvent {
    /// A job was admitted and its runner spawned.
    JobStarted {
        job_id: String,
        category: String,
        exam_code: String,
        total_targets: usize,
    },
    /// One target produced a record.
    TargetScraped {
        job_id: String,
        index: usize,
        question: String,
        progress: u8,
    },
    /// One target failed inside the pipeline and was left out.
    TargetSkipped {
        job_id: String,
        index: usize,
        question: String,
        error: String,
        progress: u8,
    },
    /// A snapshot of partial results was handed to the checkpoint writer.
    CheckpointScheduled {
        job_id: String,
        records: usize,
        path: String,
    },
    JobCompleted {
        job_id: String,
        records: usize,
        skipped: usize,
    },
    JobFailed { job_id: String, error: String },
    JobDeleted { job_id: String },
}

impl JobEvent {
    pub fn job_id(&self) -> &str {
        match self {
            JobEvent::JobStarted { job_id, .. }
            | JobEvent::TargetScraped { job_id, .. }
            | JobEvent::TargetSkipped { job_id, .. }
            | JobEvent::CheckpointScheduled { job_id, .. }
            | JobEvent::JobCompleted { job_id, .. }
            | JobEvent::JobFailed { job_id, .. }
            | JobEvent::JobDeleted { job_id } => job_id,
        }
    }
}

/// Fan-out channel for [`JobEvent`]s.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<JobEvent>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Emit an event to all subscribers. Silently ignores if no subscribers.
    pub fn emit(&self, event: JobEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to receive all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = JobEvent::TargetSkipped {
            job_id: "job_1_1700000000".to_string(),
            index: 4,
            question: "12".to_string(),
            error: "Scrape error: boom".to_string(),
            progress: 50,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"TargetSkipped""#));

        let parsed: JobEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
        assert_eq!(parsed.job_id(), "job_1_1700000000");
    }

    #[test]
    fn test_event_bus_emit_no_subscribers() {
        let bus = EventBus::new(4);
        bus.emit(JobEvent::JobDeleted {
            job_id: "job_1".to_string(),
        });
    }

    #[test]
    fn test_event_bus_subscribe_receive() {
        let bus = EventBus::new(4);
        let mut rx = bus.subscribe();

        bus.emit(JobEvent::JobFailed {
            job_id: "job_2".to_string(),
            error: "cannot create checkpoint directory".to_string(),
        });

        match rx.try_recv().unwrap() {
            JobEvent::JobFailed { job_id, .. } => assert_eq!(job_id, "job_2"),
            other => panic!("wrong event: {other:?}"),
        }
    }
}
