//! Application configuration options

use std::time::Duration;

use crate::storage::layout::StorageLayout;
use crate::storage::settings::Settings;
use crate::store::DEFAULT_RECENT_JOBS;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Storage configuration
    pub storage: StorageOptions,

    /// Server configuration
    pub server: ServerOptions,

    /// External tools
    pub tools: ToolOptions,

    /// Bound of the recent jobs listing
    pub recent_jobs_limit: usize,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            lifecycle: LifecycleOptions::default(),
            storage: StorageOptions::default(),
            server: ServerOptions::default(),
            tools: ToolOptions::default(),
            recent_jobs_limit: DEFAULT_RECENT_JOBS,
        }
    }
}

impl AppOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            lifecycle: LifecycleOptions::default(),
            storage: StorageOptions {
                layout: StorageLayout::new(settings.data_dir.clone()),
                ephemeral: false,
            },
            server: ServerOptions {
                host: settings.server.host.clone(),
                port: settings.server.port,
            },
            tools: ToolOptions {
                docker_bin: settings.docker_bin.clone(),
                ssh_bin: settings.ssh_bin.clone(),
                ssh_connect_timeout: Duration::from_secs(settings.ssh_connect_timeout_secs),
            },
            recent_jobs_limit: settings.recent_jobs_limit,
        }
    }
}

/// Lifecycle options
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// Storage configuration options
#[derive(Debug, Clone, Default)]
pub struct StorageOptions {
    /// Storage layout paths
    pub layout: StorageLayout,

    /// Keep everything in memory and write nothing to disk
    pub ephemeral: bool,
}

/// Local HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Binaries the adapters drive
#[derive(Debug, Clone)]
pub struct ToolOptions {
    pub docker_bin: String,
    pub ssh_bin: String,
    pub ssh_connect_timeout: Duration,
}

impl Default for ToolOptions {
    fn default() -> Self {
        Self {
            docker_bin: "docker".to_string(),
            ssh_bin: "ssh".to_string(),
            ssh_connect_timeout: Duration::from_secs(10),
        }
    }
}
