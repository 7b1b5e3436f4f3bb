//! Container engine collaborator
//!
//! Builds images, publishes them and answers image lookups. The pipeline
//! only sees this trait; [`docker::DockerCli`] is the production adapter.

pub mod docker;

use std::path::PathBuf;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::deploy::progress::ProgressStream;
use crate::errors::DockhandError;

/// Everything the engine needs to build one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    /// Effective build context directory
    pub context_dir: PathBuf,

    /// Full target reference, `<user>/<image>:<tag>`
    pub image_ref: String,

    /// Target platform, e.g. `linux/amd64`
    pub platform: Option<String>,

    /// Build file path relative to `context_dir`
    pub dockerfile: Option<PathBuf>,
}

#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Start a build and stream its progress
    async fn build(&self, request: BuildRequest) -> Result<ProgressStream, DockhandError>;

    /// Authenticate against the registry and push `image_ref`
    async fn push(
        &self,
        image_ref: &str,
        username: &str,
        password: SecretString,
    ) -> Result<ProgressStream, DockhandError>;

    /// Whether `image_ref` resolves to a local image
    async fn image_exists(&self, image_ref: &str) -> Result<bool, DockhandError>;

    /// Point `target` at the image `source`
    async fn tag(&self, source: &str, target: &str) -> Result<(), DockhandError>;
}
