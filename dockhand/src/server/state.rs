//! Server state

use std::sync::Arc;

use crate::jobs::service::JobService;
use crate::profiles::ProfileManager;

/// Server state shared across handlers
pub struct ServerState {
    pub jobs: Arc<JobService>,
    pub profiles: Arc<ProfileManager>,
}

impl ServerState {
    pub fn new(jobs: Arc<JobService>, profiles: Arc<ProfileManager>) -> Self {
        Self { jobs, profiles }
    }
}
