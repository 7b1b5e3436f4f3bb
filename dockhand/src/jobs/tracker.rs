//! Live job tracker
//!
//! In-memory state of jobs that are still executing. Each entry is written
//! only by the task running that job; readers get cloned snapshots.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::deploy::fsm::{JobEvent, JobFsm};
use crate::errors::DockhandError;
use crate::models::job::{JobId, JobStatus};

/// Live entry of one job
#[derive(Debug, Clone)]
struct LiveJob {
    fsm: JobFsm,
    logs: Vec<String>,
}

/// Point-in-time copy of a live entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveSnapshot {
    pub status: JobStatus,
    pub logs: Vec<String>,
}

/// In-memory map of executing jobs
#[derive(Default)]
pub struct JobTracker {
    entries: RwLock<HashMap<JobId, LiveJob>>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a freshly created job in pending state
    pub fn register(&self, id: JobId) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            id,
            LiveJob {
                fsm: JobFsm::new(),
                logs: Vec::new(),
            },
        );
    }

    pub fn contains(&self, id: JobId) -> bool {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.contains_key(&id)
    }

    /// Append output to a job's log, one entry per non-blank physical line.
    ///
    /// Returns false when the job is not tracked.
    pub fn append_log(&self, id: JobId, text: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        match entries.get_mut(&id) {
            Some(job) => {
                job.logs.extend(
                    text.lines()
                        .map(str::trim_end)
                        .filter(|line| !line.trim().is_empty())
                        .map(str::to_string),
                );
                true
            }
            None => false,
        }
    }

    /// Drive the job's state machine
    pub fn transition(&self, id: JobId, event: JobEvent) -> Result<JobStatus, DockhandError> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let job = entries
            .get_mut(&id)
            .ok_or_else(|| DockhandError::NotFound(format!("live job {}", id)))?;
        job.fsm.process(event).map_err(DockhandError::TransitionError)
    }

    pub fn snapshot(&self, id: JobId) -> Option<LiveSnapshot> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(&id).map(|job| LiveSnapshot {
            status: job.fsm.state(),
            logs: job.logs.clone(),
        })
    }

    /// Snapshots of every tracked job, taken under one lock
    pub fn snapshots(&self) -> HashMap<JobId, LiveSnapshot> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .iter()
            .map(|(id, job)| {
                (
                    *id,
                    LiveSnapshot {
                        status: job.fsm.state(),
                        logs: job.logs.clone(),
                    },
                )
            })
            .collect()
    }

    /// Stop tracking a job
    pub fn remove(&self, id: JobId) -> Option<LiveSnapshot> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(&id).map(|job| LiveSnapshot {
            status: job.fsm.state(),
            logs: job.logs,
        })
    }

    /// Ids of all tracked jobs
    pub fn ids(&self) -> Vec<JobId> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Appends lines to one job's log, optionally under a stage prefix.
#[derive(Clone)]
pub struct JobLogger {
    tracker: Arc<JobTracker>,
    job_id: JobId,
    prefix: Option<&'static str>,
}

impl JobLogger {
    pub fn new(tracker: Arc<JobTracker>, job_id: JobId) -> Self {
        Self {
            tracker,
            job_id,
            prefix: None,
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Logger writing to the same job with every line prefixed
    pub fn scoped(&self, prefix: &'static str) -> Self {
        Self {
            tracker: self.tracker.clone(),
            job_id: self.job_id,
            prefix: Some(prefix),
        }
    }

    pub fn log(&self, text: impl AsRef<str>) {
        let text = text.as_ref();
        match self.prefix {
            Some(prefix) => {
                let prefixed: Vec<String> = text
                    .lines()
                    .filter(|line| !line.trim().is_empty())
                    .map(|line| format!("{} {}", prefix, line))
                    .collect();
                if !prefixed.is_empty() {
                    self.tracker.append_log(self.job_id, &prefixed.join("\n"));
                }
            }
            None => {
                self.tracker.append_log(self.job_id, text);
            }
        }
    }
}
