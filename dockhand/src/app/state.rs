//! Application state management

use std::sync::Arc;

use tracing::{info, warn};

use crate::app::options::AppOptions;
use crate::deploy::orchestrator::Orchestrator;
use crate::deploy::stages::default_pipeline;
use crate::engine::docker::DockerCli;
use crate::engine::ContainerEngine;
use crate::errors::DockhandError;
use crate::jobs::service::JobService;
use crate::jobs::tracker::JobTracker;
use crate::profiles::ProfileManager;
use crate::remote::ssh::SshCli;
use crate::remote::RemoteExecutor;
use crate::store::file::FileStore;
use crate::store::memory::MemoryStore;
use crate::store::Store;

/// Main application state
pub struct AppState {
    pub version: String,

    /// Jobs currently executing
    pub tracker: Arc<JobTracker>,

    /// Deployment submissions and job reads
    pub jobs: Arc<JobService>,

    /// Saved profiles
    pub profiles: Arc<ProfileManager>,
}

impl AppState {
    /// Wire the stores, adapters and services together
    pub async fn init(version: String, options: &AppOptions) -> Result<Self, DockhandError> {
        info!("Initializing application state...");

        let store: Arc<dyn Store> = if options.storage.ephemeral {
            info!("Using in-memory store, nothing will be persisted");
            Arc::new(MemoryStore::new())
        } else {
            info!("Using file store in {}", options.storage.layout.base_dir.display());
            Arc::new(FileStore::open(&options.storage.layout).await?)
        };

        let engine: Arc<dyn ContainerEngine> = Arc::new(DockerCli::new(options.tools.docker_bin.clone()));
        let remote: Arc<dyn RemoteExecutor> = Arc::new(
            SshCli::new(options.tools.ssh_bin.clone()).with_connect_timeout(options.tools.ssh_connect_timeout),
        );

        let tracker = Arc::new(JobTracker::new());
        let orchestrator = Arc::new(Orchestrator::new(
            tracker.clone(),
            store.clone(),
            default_pipeline(engine, remote),
        ));

        let jobs = Arc::new(JobService::new(store.clone(), orchestrator, options.recent_jobs_limit));
        let profiles = Arc::new(ProfileManager::new(store));

        Ok(Self {
            version,
            tracker,
            jobs,
            profiles,
        })
    }

    pub async fn shutdown(&self) -> Result<(), DockhandError> {
        let running = self.tracker.ids();
        if !running.is_empty() {
            warn!(
                "Shutting down with {} job(s) still running: {:?}",
                running.len(),
                running
            );
        }
        Ok(())
    }
}
