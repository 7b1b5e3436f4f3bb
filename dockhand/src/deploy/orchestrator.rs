//! Deployment orchestrator

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::deploy::fsm::JobEvent;
use crate::deploy::stages::Stage;
use crate::errors::DockhandError;
use crate::jobs::tracker::{JobLogger, JobTracker};
use crate::models::deployment::DeploymentConfig;
use crate::models::job::{join_log_lines, JobId, JobStatus};
use crate::models::tag::TagRecord;
use crate::store::Store;

/// Drives tracked jobs through the stage list
pub struct Orchestrator {
    tracker: Arc<JobTracker>,
    store: Arc<dyn Store>,
    stages: Vec<Arc<dyn Stage>>,
}

impl Orchestrator {
    pub fn new(tracker: Arc<JobTracker>, store: Arc<dyn Store>, stages: Vec<Arc<dyn Stage>>) -> Self {
        Self {
            tracker,
            store,
            stages,
        }
    }

    pub fn tracker(&self) -> &Arc<JobTracker> {
        &self.tracker
    }

    /// Run a job on its own task
    pub fn spawn(self: &Arc<Self>, job_id: JobId, config: DeploymentConfig) -> JoinHandle<()> {
        let orchestrator = self.clone();
        tokio::spawn(async move { orchestrator.run(job_id, config).await })
    }

    /// Execute every stage of a tracked job. Untracked ids are ignored.
    pub async fn run(&self, job_id: JobId, config: DeploymentConfig) {
        if !self.tracker.contains(job_id) {
            debug!("Job {} is not tracked, nothing to run", job_id);
            return;
        }

        if let Err(e) = self.tracker.transition(job_id, JobEvent::Start) {
            error!("Job {} cannot start: {}", job_id, e);
            return;
        }
        info!("Job {} running: {}", job_id, config.image_ref());
        if let Err(e) = self.flush(job_id).await {
            warn!("Failed to persist job {} progress: {}", job_id, e);
        }

        let logger = JobLogger::new(self.tracker.clone(), job_id);
        let event = match self.run_stages(job_id, &config, &logger).await {
            Ok(()) => {
                logger.log("Deployment completed successfully");
                JobEvent::Complete
            }
            Err(e) => {
                error!("Job {} failed: {}", job_id, e);
                logger.log(format!("Deployment failed: {}", e));
                JobEvent::Fail(e.to_string())
            }
        };

        if let Err(e) = self.tracker.transition(job_id, event) {
            error!("Job {} cannot finish: {}", job_id, e);
            return;
        }

        self.finalize(job_id, &config).await;
    }

    async fn run_stages(
        &self,
        job_id: JobId,
        config: &DeploymentConfig,
        logger: &JobLogger,
    ) -> Result<(), DockhandError> {
        for stage in &self.stages {
            let kind = stage.kind();
            logger.log(format!("Starting {} stage", kind));
            stage
                .run(config, logger)
                .await
                .map_err(|e| e.into_stage_failure(kind))?;
            logger.log(format!("Finished {} stage", kind));

            if let Err(e) = self.flush(job_id).await {
                warn!("Failed to persist job {} progress: {}", job_id, e);
            }
        }
        Ok(())
    }

    /// Write the live status and log to the job store
    async fn flush(&self, job_id: JobId) -> Result<(), DockhandError> {
        let snapshot = self
            .tracker
            .snapshot(job_id)
            .ok_or_else(|| DockhandError::NotFound(format!("live job {}", job_id)))?;
        self.store
            .update_job(job_id, snapshot.status, join_log_lines(&snapshot.logs))
            .await
    }

    /// Persist the terminal state, record the tag on success, then drop the live entry.
    ///
    /// When the terminal write fails the live entry stays so readers keep
    /// seeing the final state.
    async fn finalize(&self, job_id: JobId, config: &DeploymentConfig) {
        let status = match self.tracker.snapshot(job_id) {
            Some(snapshot) => snapshot.status,
            None => return,
        };

        if let Err(e) = self.flush(job_id).await {
            error!("Failed to persist final state of job {}: {}", job_id, e);
            return;
        }

        if status == JobStatus::Completed {
            let record = TagRecord::new(config.image_key(), config.image_tag.clone(), job_id);
            match self.store.record_tag(record).await {
                Ok(()) => debug!("Recorded tag {} for job {}", config.image_ref(), job_id),
                Err(e) => error!("Failed to record tag {} for job {}: {}", config.image_ref(), job_id, e),
            }
        }

        self.tracker.remove(job_id);
        info!("Job {} finished: {}", job_id, status);
    }
}
