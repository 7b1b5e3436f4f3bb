//! Settings file management

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::DockhandError;
use crate::filesys::file::File;
use crate::logs::LogLevel;

/// Default location of the settings file
pub const DEFAULT_SETTINGS_PATH: &str = "/etc/dockhand/settings.json";

/// Service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit logs as JSON
    #[serde(default)]
    pub log_json: bool,

    /// Directory for a daily rolling log file
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Local HTTP server
    #[serde(default)]
    pub server: ServerSettings,

    /// Where the file store keeps its collections
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Bound of the recent jobs listing
    #[serde(default = "default_recent_jobs_limit")]
    pub recent_jobs_limit: usize,

    /// Container engine binary
    #[serde(default = "default_docker_bin")]
    pub docker_bin: String,

    /// Remote shell client binary
    #[serde(default = "default_ssh_bin")]
    pub ssh_bin: String,

    #[serde(default = "default_ssh_connect_timeout")]
    pub ssh_connect_timeout_secs: u64,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("/var/lib/dockhand")
}

fn default_recent_jobs_limit() -> usize {
    crate::store::DEFAULT_RECENT_JOBS
}

fn default_docker_bin() -> String {
    "docker".to_string()
}

fn default_ssh_bin() -> String {
    "ssh".to_string()
}

fn default_ssh_connect_timeout() -> u64 {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            log_dir: None,
            server: ServerSettings::default(),
            data_dir: default_data_dir(),
            recent_jobs_limit: default_recent_jobs_limit(),
            docker_bin: default_docker_bin(),
            ssh_bin: default_ssh_bin(),
            ssh_connect_timeout_secs: default_ssh_connect_timeout(),
        }
    }
}

impl Settings {
    /// Read settings, falling back to defaults when the file does not exist
    pub async fn load(file: &File) -> Result<Self, DockhandError> {
        let settings: Settings = file.read_json_or_default().await.map_err(|e| {
            DockhandError::ConfigError(format!("unable to read {}: {}", file.path().display(), e))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), DockhandError> {
        if self.recent_jobs_limit == 0 {
            return Err(DockhandError::ConfigError(
                "recent_jobs_limit must be at least 1".to_string(),
            ));
        }
        if self.docker_bin.trim().is_empty() || self.ssh_bin.trim().is_empty() {
            return Err(DockhandError::ConfigError(
                "docker_bin and ssh_bin must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}
