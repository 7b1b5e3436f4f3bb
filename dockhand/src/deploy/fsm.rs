//! Finite State Machine for deployment jobs

use crate::models::job::JobStatus;

/// Job event
#[derive(Debug, Clone)]
pub enum JobEvent {
    /// Orchestrator picked the job up
    Start,

    /// All stages succeeded
    Complete,

    /// A stage failed
    Fail(String),
}

/// Job FSM
///
/// pending -> running -> {completed | failed}. Completed and failed are
/// terminal; a failed job is never retried, a new deployment is a new job.
#[derive(Debug, Clone)]
pub struct JobFsm {
    state: JobStatus,
    error: Option<String>,
}

impl JobFsm {
    /// Create a new FSM in pending state
    pub fn new() -> Self {
        Self {
            state: JobStatus::Pending,
            error: None,
        }
    }

    /// Get current state
    pub fn state(&self) -> JobStatus {
        self.state
    }

    /// Get error message if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: JobEvent) -> Result<JobStatus, String> {
        let new_state = match (&self.state, &event) {
            (JobStatus::Pending, JobEvent::Start) => JobStatus::Running,

            (JobStatus::Running, JobEvent::Complete) => JobStatus::Completed,
            (JobStatus::Running, JobEvent::Fail(err)) => {
                self.error = Some(err.clone());
                JobStatus::Failed
            }

            // Invalid transitions
            (state, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
            }
        };

        self.state = new_state;
        Ok(new_state)
    }
}

impl Default for JobFsm {
    fn default() -> Self {
        Self::new()
    }
}
