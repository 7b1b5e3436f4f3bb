//! Profile manager
//!
//! Saved deployment configs. Credential fields are sealed individually with
//! the vault before they reach the store and opened again only on load.

use std::sync::Arc;

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use crate::errors::DockhandError;
use crate::models::deployment::DeploymentConfig;
use crate::models::profile::{Profile, ProfileId, ProfileSummary};
use crate::store::{NewProfile, Store};
use crate::vault;

pub struct ProfileManager {
    store: Arc<dyn Store>,
}

impl ProfileManager {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Create a profile, or replace profile `id` when given.
    pub async fn save(
        &self,
        id: Option<ProfileId>,
        name: &str,
        passphrase: SecretString,
        config: DeploymentConfig,
    ) -> Result<ProfileId, DockhandError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DockhandError::ValidationError("profile name is required".to_string()));
        }
        if passphrase.expose_secret().trim().is_empty() {
            return Err(DockhandError::ValidationError("passphrase is required".to_string()));
        }

        let existing = match id {
            Some(id) => Some(
                self.store
                    .get_profile(id)
                    .await?
                    .ok_or_else(|| DockhandError::NotFound(format!("profile {}", id)))?,
            ),
            None => None,
        };

        let sealed = tokio::task::spawn_blocking(move || seal_credentials(config, &passphrase)).await??;
        let now = Utc::now();

        match existing {
            Some(existing) => {
                let id = existing.id;
                self.store
                    .update_profile(Profile {
                        id,
                        name: name.to_string(),
                        config: sealed,
                        created_at: existing.created_at,
                        updated_at: now,
                    })
                    .await?;
                info!("Updated profile {} ({})", id, name);
                Ok(id)
            }
            None => {
                let id = self
                    .store
                    .insert_profile(NewProfile {
                        name: name.to_string(),
                        config: sealed,
                        created_at: now,
                        updated_at: now,
                    })
                    .await?;
                info!("Created profile {} ({})", id, name);
                Ok(id)
            }
        }
    }

    /// Decrypt a profile's config. Any field that fails to open fails the load.
    pub async fn load(&self, id: ProfileId, passphrase: SecretString) -> Result<DeploymentConfig, DockhandError> {
        let profile = self
            .store
            .get_profile(id)
            .await?
            .ok_or_else(|| DockhandError::NotFound(format!("profile {}", id)))?;

        let opened = tokio::task::spawn_blocking(move || open_credentials(profile.config, &passphrase)).await?;
        match opened {
            Ok(config) => {
                debug!("Loaded profile {}", id);
                Ok(config)
            }
            Err(e) => {
                warn!("Failed to open profile {}: {}", id, e);
                Err(DockhandError::AuthenticationFailure)
            }
        }
    }

    pub async fn delete(&self, id: ProfileId) -> Result<(), DockhandError> {
        if !self.store.delete_profile(id).await? {
            return Err(DockhandError::NotFound(format!("profile {}", id)));
        }
        info!("Deleted profile {}", id);
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<ProfileSummary>, DockhandError> {
        let profiles = self.store.list_profiles().await?;
        Ok(profiles.iter().map(ProfileSummary::from).collect())
    }
}

/// Encrypt every present credential field. Blank optional fields become absent.
pub fn seal_credentials(
    mut config: DeploymentConfig,
    passphrase: &SecretString,
) -> Result<DeploymentConfig, DockhandError> {
    if !config.docker_hub_password.is_empty() {
        config.docker_hub_password = vault::encrypt(&config.docker_hub_password, passphrase)?;
    }
    for field in [
        &mut config.ssh_password,
        &mut config.ssh_private_key,
        &mut config.ssh_passphrase,
    ] {
        *field = match field.take().filter(|v| !v.trim().is_empty()) {
            Some(plain) => Some(vault::encrypt(&plain, passphrase)?),
            None => None,
        };
    }
    Ok(config)
}

/// Decrypt every present credential field
pub fn open_credentials(
    mut config: DeploymentConfig,
    passphrase: &SecretString,
) -> Result<DeploymentConfig, DockhandError> {
    if !config.docker_hub_password.is_empty() {
        config.docker_hub_password = vault::decrypt(&config.docker_hub_password, passphrase)?;
    }
    for field in [
        &mut config.ssh_password,
        &mut config.ssh_private_key,
        &mut config.ssh_passphrase,
    ] {
        if let Some(sealed) = field.take() {
            *field = Some(vault::decrypt(&sealed, passphrase)?);
        }
    }
    Ok(config)
}
