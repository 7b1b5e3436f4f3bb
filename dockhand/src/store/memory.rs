//! In-process store

use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::DockhandError;
use crate::models::job::{JobId, JobRecord, JobStatus};
use crate::models::profile::{Profile, ProfileId};
use crate::models::tag::TagRecord;
use crate::store::{self, Collection, JobStore, NewProfile, ProfileStore, TagLedger};

/// Store that lives and dies with the process
#[derive(Default)]
pub struct MemoryStore {
    jobs: Mutex<Collection<JobRecord>>,
    profiles: Mutex<Collection<Profile>>,
    tags: Mutex<Vec<TagRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn create_job(&self, config: serde_json::Value) -> Result<JobRecord, DockhandError> {
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(store::new_job(&mut jobs, config))
    }

    async fn update_job(&self, id: JobId, status: JobStatus, logs: String) -> Result<(), DockhandError> {
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        store::update_job(&mut jobs, id, status, logs)
    }

    async fn get_job(&self, id: JobId) -> Result<Option<JobRecord>, DockhandError> {
        let jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(jobs.items.iter().find(|job| job.id == id).cloned())
    }

    async fn recent_jobs(&self, limit: usize) -> Result<Vec<JobRecord>, DockhandError> {
        let jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(store::recent_jobs(&jobs, limit))
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn insert_profile(&self, profile: NewProfile) -> Result<ProfileId, DockhandError> {
        let mut profiles = self.profiles.lock().unwrap_or_else(|e| e.into_inner());
        Ok(store::insert_profile(&mut profiles, profile))
    }

    async fn update_profile(&self, profile: Profile) -> Result<(), DockhandError> {
        let mut profiles = self.profiles.lock().unwrap_or_else(|e| e.into_inner());
        store::replace_profile(&mut profiles, profile)
    }

    async fn get_profile(&self, id: ProfileId) -> Result<Option<Profile>, DockhandError> {
        let profiles = self.profiles.lock().unwrap_or_else(|e| e.into_inner());
        Ok(profiles.items.iter().find(|p| p.id == id).cloned())
    }

    async fn delete_profile(&self, id: ProfileId) -> Result<bool, DockhandError> {
        let mut profiles = self.profiles.lock().unwrap_or_else(|e| e.into_inner());
        let before = profiles.items.len();
        profiles.items.retain(|p| p.id != id);
        Ok(profiles.items.len() != before)
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, DockhandError> {
        let profiles = self.profiles.lock().unwrap_or_else(|e| e.into_inner());
        Ok(store::sorted_profiles(&profiles))
    }
}

#[async_trait]
impl TagLedger for MemoryStore {
    async fn record_tag(&self, record: TagRecord) -> Result<(), DockhandError> {
        let mut tags = self.tags.lock().unwrap_or_else(|e| e.into_inner());
        store::push_tag(&mut tags, record)
    }

    async fn image_tags(&self, image_key: &str) -> Result<Vec<TagRecord>, DockhandError> {
        let tags = self.tags.lock().unwrap_or_else(|e| e.into_inner());
        Ok(store::tags_for(&tags, image_key))
    }
}
