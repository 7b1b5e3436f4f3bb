//! Deployment service
//!
//! Accepts deployment submissions and answers job reads, merging the live
//! tracker state over the durable job rows.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::deploy::orchestrator::Orchestrator;
use crate::errors::DockhandError;
use crate::jobs::tracker::{JobTracker, LiveSnapshot};
use crate::models::deployment::DeploymentConfig;
use crate::models::job::{Job, JobId, JobRecord};
use crate::models::tag::TagRecord;
use crate::store::Store;

/// Result of an accepted deployment request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub job_id: JobId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

pub struct JobService {
    store: Arc<dyn Store>,
    tracker: Arc<JobTracker>,
    orchestrator: Arc<Orchestrator>,
    recent_limit: usize,
}

impl JobService {
    pub fn new(store: Arc<dyn Store>, orchestrator: Arc<Orchestrator>, recent_limit: usize) -> Self {
        Self {
            store,
            tracker: orchestrator.tracker().clone(),
            orchestrator,
            recent_limit,
        }
    }

    /// Validate, persist and launch a deployment. Returns before any stage runs.
    pub async fn submit(&self, config: DeploymentConfig) -> Result<Submission, DockhandError> {
        config.validate()?;

        let warning = match self.store.tag_exists(&config.image_key(), &config.image_tag).await {
            Ok(true) => Some(format!(
                "Tag {} was already deployed for {}; pushing will overwrite it in the registry",
                config.image_tag,
                config.image_key()
            )),
            Ok(false) => None,
            Err(e) => {
                warn!("Failed to check tag history for {}: {}", config.image_ref(), e);
                None
            }
        };

        let record = self.store.create_job(config.snapshot()).await?;
        self.tracker.register(record.id);
        info!("Accepted job {} for {}", record.id, config.image_ref());

        self.orchestrator.spawn(record.id, config);

        Ok(Submission {
            job_id: record.id,
            warning,
        })
    }

    /// Job by id. The live snapshot is taken before the durable read: the
    /// tracker entry is only evicted after the terminal row is written, so a
    /// missing snapshot means the row read afterwards is already final.
    pub async fn get_job(&self, id: JobId) -> Result<Job, DockhandError> {
        let live = self.tracker.snapshot(id);
        let record = self
            .store
            .get_job(id)
            .await?
            .ok_or_else(|| DockhandError::NotFound(format!("job {}", id)))?;
        Ok(merge(record, live))
    }

    /// Most recent durable jobs, each overridden by its live state when tracked
    pub async fn recent_jobs(&self) -> Result<Vec<Job>, DockhandError> {
        let mut live = self.tracker.snapshots();
        let records = self.store.recent_jobs(self.recent_limit).await?;
        Ok(records
            .into_iter()
            .map(|record| {
                let snapshot = live.remove(&record.id);
                merge(record, snapshot)
            })
            .collect())
    }

    pub async fn image_tags(&self, image_key: &str) -> Result<Vec<TagRecord>, DockhandError> {
        if image_key.trim().is_empty() {
            return Err(DockhandError::ValidationError("imageKey is required".to_string()));
        }
        self.store.image_tags(image_key).await
    }
}

fn merge(record: JobRecord, live: Option<LiveSnapshot>) -> Job {
    let mut job = Job::from(record);
    if let Some(live) = live {
        job.status = live.status;
        job.logs = live.logs;
    }
    job
}
