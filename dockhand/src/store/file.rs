//! JSON-file store
//!
//! Each collection lives in its own file under the data directory and is
//! rewritten atomically after every mutation.

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::DockhandError;
use crate::filesys::file::File;
use crate::models::job::{JobId, JobRecord, JobStatus};
use crate::models::profile::{Profile, ProfileId};
use crate::models::tag::TagRecord;
use crate::storage::layout::StorageLayout;
use crate::store::{self, Collection, JobStore, NewProfile, ProfileStore, TagLedger};

struct Persisted<T> {
    file: File,
    data: Mutex<T>,
}

impl<T> Persisted<T>
where
    T: serde::Serialize + serde::de::DeserializeOwned + Default,
{
    async fn open(file: File) -> Result<Self, DockhandError> {
        let data = file.read_json_or_default::<T>().await.map_err(|e| {
            DockhandError::StorageError(format!("failed to load {}: {}", file.path().display(), e))
        })?;
        debug!("Loaded {}", file.path().display());
        Ok(Self {
            file,
            data: Mutex::new(data),
        })
    }

    async fn save(&self, data: &T) -> Result<(), DockhandError> {
        self.file.write_json(data).await.map_err(|e| {
            DockhandError::StorageError(format!("failed to write {}: {}", self.file.path().display(), e))
        })
    }
}

/// Store backed by `jobs.json`, `profiles.json` and `tags.json`
pub struct FileStore {
    jobs: Persisted<Collection<JobRecord>>,
    profiles: Persisted<Collection<Profile>>,
    tags: Persisted<Vec<TagRecord>>,
}

impl FileStore {
    pub async fn open(layout: &StorageLayout) -> Result<Self, DockhandError> {
        layout.data_dir().create().await?;
        Ok(Self {
            jobs: Persisted::open(layout.jobs_file()).await?,
            profiles: Persisted::open(layout.profiles_file()).await?,
            tags: Persisted::open(layout.tags_file()).await?,
        })
    }
}

#[async_trait]
impl JobStore for FileStore {
    async fn create_job(&self, config: serde_json::Value) -> Result<JobRecord, DockhandError> {
        let mut jobs = self.jobs.data.lock().await;
        let mut next = jobs.clone();
        let record = store::new_job(&mut next, config);
        self.jobs.save(&next).await?;
        *jobs = next;
        Ok(record)
    }

    async fn update_job(&self, id: JobId, status: JobStatus, logs: String) -> Result<(), DockhandError> {
        let mut jobs = self.jobs.data.lock().await;
        let mut next = jobs.clone();
        store::update_job(&mut next, id, status, logs)?;
        self.jobs.save(&next).await?;
        *jobs = next;
        Ok(())
    }

    async fn get_job(&self, id: JobId) -> Result<Option<JobRecord>, DockhandError> {
        let jobs = self.jobs.data.lock().await;
        Ok(jobs.items.iter().find(|job| job.id == id).cloned())
    }

    async fn recent_jobs(&self, limit: usize) -> Result<Vec<JobRecord>, DockhandError> {
        let jobs = self.jobs.data.lock().await;
        Ok(store::recent_jobs(&jobs, limit))
    }
}

#[async_trait]
impl ProfileStore for FileStore {
    async fn insert_profile(&self, profile: NewProfile) -> Result<ProfileId, DockhandError> {
        let mut profiles = self.profiles.data.lock().await;
        let mut next = profiles.clone();
        let id = store::insert_profile(&mut next, profile);
        self.profiles.save(&next).await?;
        *profiles = next;
        Ok(id)
    }

    async fn update_profile(&self, profile: Profile) -> Result<(), DockhandError> {
        let mut profiles = self.profiles.data.lock().await;
        let mut next = profiles.clone();
        store::replace_profile(&mut next, profile)?;
        self.profiles.save(&next).await?;
        *profiles = next;
        Ok(())
    }

    async fn get_profile(&self, id: ProfileId) -> Result<Option<Profile>, DockhandError> {
        let profiles = self.profiles.data.lock().await;
        Ok(profiles.items.iter().find(|p| p.id == id).cloned())
    }

    async fn delete_profile(&self, id: ProfileId) -> Result<bool, DockhandError> {
        let mut profiles = self.profiles.data.lock().await;
        if !profiles.items.iter().any(|p| p.id == id) {
            return Ok(false);
        }
        let mut next = profiles.clone();
        next.items.retain(|p| p.id != id);
        self.profiles.save(&next).await?;
        *profiles = next;
        Ok(true)
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, DockhandError> {
        let profiles = self.profiles.data.lock().await;
        Ok(store::sorted_profiles(&profiles))
    }
}

#[async_trait]
impl TagLedger for FileStore {
    async fn record_tag(&self, record: TagRecord) -> Result<(), DockhandError> {
        let mut tags = self.tags.data.lock().await;
        let mut next = tags.clone();
        store::push_tag(&mut next, record)?;
        self.tags.save(&next).await?;
        *tags = next;
        Ok(())
    }

    async fn image_tags(&self, image_key: &str) -> Result<Vec<TagRecord>, DockhandError> {
        let tags = self.tags.data.lock().await;
        Ok(store::tags_for(&tags, image_key))
    }
}
