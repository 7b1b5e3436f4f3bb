//! Profile models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::deployment::DeploymentConfig;

pub type ProfileId = i64;

/// A saved deployment profile.
///
/// The credential fields of `config` (registry password, ssh password,
/// ssh private key, ssh passphrase) hold vault envelopes, never plaintext.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: ProfileId,
    pub name: String,
    pub config: DeploymentConfig,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing view of a profile, without any ciphertext
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub id: ProfileId,
    pub name: String,
    pub image_name: String,
    pub ssh_host: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Profile> for ProfileSummary {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id,
            name: profile.name.clone(),
            image_name: profile.config.image_name.clone(),
            ssh_host: profile.config.ssh_host.clone(),
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        }
    }
}
