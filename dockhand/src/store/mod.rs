//! Durable store collaborator
//!
//! Job history, saved profiles and the image tag ledger. Two adapters are
//! provided: [`memory::MemoryStore`] and the JSON-file backed
//! [`file::FileStore`].

pub mod file;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DockhandError;
use crate::models::deployment::DeploymentConfig;
use crate::models::job::{JobId, JobRecord, JobStatus};
use crate::models::profile::{Profile, ProfileId};
use crate::models::tag::TagRecord;

/// Default bound of the "recent jobs" query
pub const DEFAULT_RECENT_JOBS: usize = 3;

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a new pending job and assign its id
    async fn create_job(&self, config: serde_json::Value) -> Result<JobRecord, DockhandError>;

    /// Overwrite status and log blob of an existing job
    async fn update_job(&self, id: JobId, status: JobStatus, logs: String) -> Result<(), DockhandError>;

    async fn get_job(&self, id: JobId) -> Result<Option<JobRecord>, DockhandError>;

    /// Most recent jobs first, at most `limit`
    async fn recent_jobs(&self, limit: usize) -> Result<Vec<JobRecord>, DockhandError>;
}

/// Fields of a profile row other than its id
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub name: String,
    pub config: DeploymentConfig,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn insert_profile(&self, profile: NewProfile) -> Result<ProfileId, DockhandError>;

    /// Replace an existing profile; `NotFound` when absent
    async fn update_profile(&self, profile: Profile) -> Result<(), DockhandError>;

    async fn get_profile(&self, id: ProfileId) -> Result<Option<Profile>, DockhandError>;

    /// Remove a profile; returns whether it existed
    async fn delete_profile(&self, id: ProfileId) -> Result<bool, DockhandError>;

    /// Most recently updated first
    async fn list_profiles(&self) -> Result<Vec<Profile>, DockhandError>;
}

#[async_trait]
pub trait TagLedger: Send + Sync {
    /// Append a record. Only an identical `(image_key, tag, created_at)` is rejected.
    async fn record_tag(&self, record: TagRecord) -> Result<(), DockhandError>;

    /// Every record for `image_key`, newest first
    async fn image_tags(&self, image_key: &str) -> Result<Vec<TagRecord>, DockhandError>;

    /// Whether `tag` was ever produced for `image_key`, across all history
    async fn tag_exists(&self, image_key: &str, tag: &str) -> Result<bool, DockhandError> {
        Ok(self
            .image_tags(image_key)
            .await?
            .iter()
            .any(|record| record.tag == tag))
    }
}

/// Everything the service needs from a durable store
pub trait Store: JobStore + ProfileStore + TagLedger {}

impl<T: JobStore + ProfileStore + TagLedger> Store for T {}

/// Rows of one collection plus the next id to hand out
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection<T> {
    pub next_id: i64,
    pub items: Vec<T>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            items: Vec::new(),
        }
    }
}

impl<T> Collection<T> {
    pub fn allocate_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

// Shared row logic so both adapters behave identically.

pub(crate) fn new_job(jobs: &mut Collection<JobRecord>, config: serde_json::Value) -> JobRecord {
    let record = JobRecord {
        id: jobs.allocate_id(),
        status: JobStatus::Pending,
        logs: String::new(),
        config,
        created_at: Utc::now(),
    };
    jobs.items.push(record.clone());
    record
}

pub(crate) fn update_job(
    jobs: &mut Collection<JobRecord>,
    id: JobId,
    status: JobStatus,
    logs: String,
) -> Result<(), DockhandError> {
    let job = jobs
        .items
        .iter_mut()
        .find(|job| job.id == id)
        .ok_or_else(|| DockhandError::NotFound(format!("job {}", id)))?;
    job.status = status;
    job.logs = logs;
    Ok(())
}

pub(crate) fn recent_jobs(jobs: &Collection<JobRecord>, limit: usize) -> Vec<JobRecord> {
    let mut recent: Vec<JobRecord> = jobs.items.clone();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    recent.truncate(limit);
    recent
}

pub(crate) fn insert_profile(profiles: &mut Collection<Profile>, profile: NewProfile) -> ProfileId {
    let id = profiles.allocate_id();
    profiles.items.push(Profile {
        id,
        name: profile.name,
        config: profile.config,
        created_at: profile.created_at,
        updated_at: profile.updated_at,
    });
    id
}

pub(crate) fn replace_profile(profiles: &mut Collection<Profile>, profile: Profile) -> Result<(), DockhandError> {
    let slot = profiles
        .items
        .iter_mut()
        .find(|p| p.id == profile.id)
        .ok_or_else(|| DockhandError::NotFound(format!("profile {}", profile.id)))?;
    *slot = profile;
    Ok(())
}

pub(crate) fn sorted_profiles(profiles: &Collection<Profile>) -> Vec<Profile> {
    let mut all = profiles.items.clone();
    all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
    all
}

pub(crate) fn push_tag(tags: &mut Vec<TagRecord>, record: TagRecord) -> Result<(), DockhandError> {
    if tags.iter().any(|existing| existing.same_identity(&record)) {
        return Err(DockhandError::StorageError(format!(
            "tag record {}:{} at {} already exists",
            record.image_key, record.tag, record.created_at
        )));
    }
    tags.push(record);
    Ok(())
}

pub(crate) fn tags_for(tags: &[TagRecord], image_key: &str) -> Vec<TagRecord> {
    let mut matching: Vec<TagRecord> = tags
        .iter()
        .filter(|record| record.image_key == image_key)
        .cloned()
        .collect();
    matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    matching
}
