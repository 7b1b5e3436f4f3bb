//! Deployment models

use serde::{Deserialize, Serialize};

use crate::errors::DockhandError;

/// Parameters of one build -> push -> deploy run.
///
/// Missing fields deserialize to their empty value so that [`validate`]
/// can report every problem with a readable message instead of a serde error.
///
/// [`validate`]: DeploymentConfig::validate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeploymentConfig {
    /// Source directory on the machine running dockhand
    pub project_path: String,

    /// Build file name, relative to `project_path`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dockerfile_name: Option<String>,

    /// Build context, relative to `project_path`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_path: Option<String>,

    pub image_name: String,
    pub image_tag: String,

    pub docker_hub_username: String,
    pub docker_hub_password: String,

    pub ssh_host: String,
    pub ssh_user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_private_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_passphrase: Option<String>,

    pub container_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_port: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_platform: Option<String>,

    /// Newline separated `KEY=VALUE` lines
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_vars: Option<String>,

    /// Newline separated bind mount specs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volumes: Option<String>,
}

impl DeploymentConfig {
    /// Check everything the pipeline needs before any job is created.
    pub fn validate(&self) -> Result<(), DockhandError> {
        let required = [
            ("projectPath", &self.project_path),
            ("imageName", &self.image_name),
            ("imageTag", &self.image_tag),
            ("dockerHubUsername", &self.docker_hub_username),
            ("dockerHubPassword", &self.docker_hub_password),
            ("sshHost", &self.ssh_host),
            ("sshUser", &self.ssh_user),
            ("containerName", &self.container_name),
        ];

        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();

        if !missing.is_empty() {
            return Err(DockhandError::ValidationError(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }

        if non_blank(&self.ssh_password).is_none() && non_blank(&self.ssh_private_key).is_none() {
            return Err(DockhandError::ValidationError(
                "either sshPassword or sshPrivateKey must be provided".to_string(),
            ));
        }

        if self.host_port.is_some() != self.container_port.is_some() {
            return Err(DockhandError::ValidationError(
                "hostPort and containerPort must be given together".to_string(),
            ));
        }

        Ok(())
    }

    /// `<user>/<image>`, the key tags are recorded under
    pub fn image_key(&self) -> String {
        format!("{}/{}", self.docker_hub_username, self.image_name)
    }

    /// `<user>/<image>:<tag>`
    pub fn image_ref(&self) -> String {
        format!("{}:{}", self.image_key(), self.image_tag)
    }

    /// Host/container port pair, when both are set
    pub fn port_mapping(&self) -> Option<(u16, u16)> {
        self.host_port.zip(self.container_port)
    }

    pub fn dockerfile(&self) -> Option<&str> {
        non_blank(&self.dockerfile_name)
    }

    pub fn context(&self) -> Option<&str> {
        non_blank(&self.context_path)
    }

    pub fn platform(&self) -> Option<&str> {
        non_blank(&self.build_platform)
    }

    pub fn env_block(&self) -> Option<&str> {
        non_blank(&self.env_vars)
    }

    pub fn volume_block(&self) -> Option<&str> {
        non_blank(&self.volumes)
    }

    pub fn password(&self) -> Option<&str> {
        non_blank(&self.ssh_password)
    }

    pub fn private_key(&self) -> Option<&str> {
        non_blank(&self.ssh_private_key)
    }

    pub fn key_passphrase(&self) -> Option<&str> {
        non_blank(&self.ssh_passphrase)
    }

    /// Copy of the config with every credential removed, safe to persist with a job.
    pub fn redacted(&self) -> Self {
        Self {
            docker_hub_password: String::new(),
            ssh_password: None,
            ssh_private_key: None,
            ssh_passphrase: None,
            ..self.clone()
        }
    }

    /// Snapshot stored alongside a job record
    pub fn snapshot(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self.redacted()).unwrap_or(serde_json::Value::Null);
        if let Some(map) = value.as_object_mut() {
            map.remove("dockerHubPassword");
        }
        value
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
