//! Image tag ledger models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::job::JobId;

/// One produced tag. Identity is `(image_key, tag, created_at)`, so the same
/// tag may appear several times across jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagRecord {
    pub image_key: String,
    pub tag: String,
    pub job_id: JobId,
    pub created_at: DateTime<Utc>,
}

impl TagRecord {
    pub fn new(image_key: impl Into<String>, tag: impl Into<String>, job_id: JobId) -> Self {
        Self {
            image_key: image_key.into(),
            tag: tag.into(),
            job_id,
            created_at: Utc::now(),
        }
    }

    pub fn same_identity(&self, other: &TagRecord) -> bool {
        self.image_key == other.image_key
            && self.tag == other.tag
            && self.created_at == other.created_at
    }
}
