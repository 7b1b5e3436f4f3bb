//! Job models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Job identifier, assigned by the job store
pub type JobId = i64;

/// Separator between log lines in the durable log blob
pub const LOG_SEPARATOR: char = '\n';

/// Job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Completed and failed jobs never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable job row. Logs are kept as a single blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub status: JobStatus,
    #[serde(default)]
    pub logs: String,
    /// Redacted deployment config the job ran with
    pub config: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Job as served to readers, after merging live state over the durable row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub logs: Vec<String>,
    pub config: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<JobRecord> for Job {
    fn from(record: JobRecord) -> Self {
        Self {
            id: record.id,
            status: record.status,
            logs: split_log_lines(&record.logs),
            config: record.config,
            created_at: record.created_at,
        }
    }
}

/// Concatenate log lines into the durable blob.
pub fn join_log_lines(lines: &[String]) -> String {
    let mut blob = String::new();
    for line in lines {
        if !blob.is_empty() {
            blob.push(LOG_SEPARATOR);
        }
        blob.push_str(line);
    }
    blob
}

/// Rebuild log lines from the durable blob, dropping empty segments.
pub fn split_log_lines(blob: &str) -> Vec<String> {
    blob.split(LOG_SEPARATOR)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
