//! Pipeline stages
//!
//! A deployment is an ordered list of [`Stage`]s. Each stage drives one
//! collaborator call and copies its progress into the job log as it arrives.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use secrecy::SecretString;
use tracing::{debug, info};

use crate::deploy::progress::{ProgressEvent, ProgressStream};
use crate::engine::{BuildRequest, ContainerEngine};
use crate::errors::DockhandError;
use crate::jobs::tracker::JobLogger;
use crate::models::deployment::DeploymentConfig;
use crate::remote::{RemoteAuth, RemoteDeployRequest, RemoteExecutor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Build,
    Push,
    Deploy,
}

impl StageKind {
    pub fn name(&self) -> &'static str {
        match self {
            StageKind::Build => "build",
            StageKind::Push => "push",
            StageKind::Deploy => "deploy",
        }
    }

    /// Prefix of the log lines a stage's collaborator produces
    pub fn log_prefix(&self) -> &'static str {
        match self {
            StageKind::Build => "[build]",
            StageKind::Push => "[push]",
            StageKind::Deploy => "[deploy]",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[async_trait]
pub trait Stage: Send + Sync {
    fn kind(&self) -> StageKind;

    async fn run(&self, config: &DeploymentConfig, logger: &JobLogger) -> Result<(), DockhandError>;
}

/// Build, push, deploy
pub fn default_pipeline(
    engine: Arc<dyn ContainerEngine>,
    remote: Arc<dyn RemoteExecutor>,
) -> Vec<Arc<dyn Stage>> {
    vec![
        Arc::new(BuildStage::new(engine.clone())),
        Arc::new(PushStage::new(engine)),
        Arc::new(DeployStage::new(remote)),
    ]
}

/// Copy a progress stream into the log, stopping at the first error.
///
/// Returns the last image id seen.
async fn drain(
    mut events: ProgressStream,
    stage: StageKind,
    logger: &JobLogger,
) -> Result<Option<String>, DockhandError> {
    let mut image_id = None;
    while let Some(event) = events.next().await {
        match event {
            ProgressEvent::Log(line) | ProgressEvent::Status(line) => logger.log(line),
            ProgressEvent::ImageId(id) => {
                logger.log(format!("Built image {}", id));
                image_id = Some(id);
            }
            ProgressEvent::Error(message) => {
                return Err(DockhandError::StageFailure { stage, message });
            }
        }
    }
    Ok(image_id)
}

/// Lexically resolve `.` and `..` without touching the filesystem
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(normalized.components().next_back(), Some(Component::Normal(_)));
                if can_pop {
                    normalized.pop();
                } else if !matches!(
                    normalized.components().next_back(),
                    Some(Component::RootDir | Component::Prefix(_))
                ) {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Path of `target` as seen from directory `base`; both are normalized first
pub fn relative_path(base: &Path, target: &Path) -> PathBuf {
    let base = normalize_path(base);
    let target = normalize_path(target);
    let base_parts: Vec<Component> = base.components().collect();
    let target_parts: Vec<Component> = target.components().collect();

    let common = base_parts
        .iter()
        .zip(target_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..base_parts.len() {
        relative.push("..");
    }
    for part in &target_parts[common..] {
        relative.push(part.as_os_str());
    }
    if relative.as_os_str().is_empty() {
        relative.push(".");
    }
    relative
}

/// Effective build context: the project path joined with the optional subpath
pub fn build_context(config: &DeploymentConfig) -> PathBuf {
    let root = Path::new(&config.project_path);
    match config.context() {
        Some(sub) => normalize_path(&root.join(sub)),
        None => normalize_path(root),
    }
}

/// Custom build file, given relative to the project root, re-expressed
/// relative to the build context
pub fn dockerfile_in_context(config: &DeploymentConfig, context: &Path) -> Option<PathBuf> {
    config.dockerfile().map(|name| {
        let absolute = Path::new(&config.project_path).join(name);
        relative_path(context, &absolute)
    })
}

pub struct BuildStage {
    engine: Arc<dyn ContainerEngine>,
}

impl BuildStage {
    pub fn new(engine: Arc<dyn ContainerEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Stage for BuildStage {
    fn kind(&self) -> StageKind {
        StageKind::Build
    }

    async fn run(&self, config: &DeploymentConfig, logger: &JobLogger) -> Result<(), DockhandError> {
        let image_ref = config.image_ref();
        let context_dir = build_context(config);
        let dockerfile = dockerfile_in_context(config, &context_dir);
        let logger = logger.scoped(self.kind().log_prefix());

        logger.log(format!("Building {} from {}", image_ref, context_dir.display()));
        if let Some(dockerfile) = &dockerfile {
            logger.log(format!("Using build file {}", dockerfile.display()));
        }

        let events = self
            .engine
            .build(BuildRequest {
                context_dir,
                image_ref: image_ref.clone(),
                platform: config.platform().map(str::to_string),
                dockerfile,
            })
            .await?;
        let image_id = drain(events, self.kind(), &logger).await?;

        if self.engine.image_exists(&image_ref).await? {
            debug!("Image {} resolved after build", image_ref);
            return Ok(());
        }

        match image_id {
            Some(id) => {
                self.engine.tag(&id, &image_ref).await?;
                logger.log(format!("Tagged {} as {}", id, image_ref));
                Ok(())
            }
            None => Err(DockhandError::StageFailure {
                stage: self.kind(),
                message: format!("image {} not found after build and no image id was reported", image_ref),
            }),
        }
    }
}

pub struct PushStage {
    engine: Arc<dyn ContainerEngine>,
}

impl PushStage {
    pub fn new(engine: Arc<dyn ContainerEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Stage for PushStage {
    fn kind(&self) -> StageKind {
        StageKind::Push
    }

    async fn run(&self, config: &DeploymentConfig, logger: &JobLogger) -> Result<(), DockhandError> {
        let image_ref = config.image_ref();
        let logger = logger.scoped(self.kind().log_prefix());
        logger.log(format!("Pushing {}", image_ref));

        let events = self
            .engine
            .push(
                &image_ref,
                &config.docker_hub_username,
                SecretString::from(config.docker_hub_password.clone()),
            )
            .await?;
        drain(events, self.kind(), &logger).await?;

        info!("Pushed {}", image_ref);
        Ok(())
    }
}

pub struct DeployStage {
    remote: Arc<dyn RemoteExecutor>,
}

impl DeployStage {
    pub fn new(remote: Arc<dyn RemoteExecutor>) -> Self {
        Self { remote }
    }
}

/// Key auth wins when both a key and a password are present
pub fn remote_auth(config: &DeploymentConfig) -> Result<RemoteAuth, DockhandError> {
    if let Some(key) = config.private_key() {
        return Ok(RemoteAuth::PrivateKey {
            key: SecretString::from(key.to_string()),
            passphrase: config
                .key_passphrase()
                .map(|p| SecretString::from(p.to_string())),
        });
    }
    match config.password() {
        Some(password) => Ok(RemoteAuth::Password(SecretString::from(password.to_string()))),
        None => Err(DockhandError::ValidationError(
            "either sshPassword or sshPrivateKey must be provided".to_string(),
        )),
    }
}

#[async_trait]
impl Stage for DeployStage {
    fn kind(&self) -> StageKind {
        StageKind::Deploy
    }

    async fn run(&self, config: &DeploymentConfig, logger: &JobLogger) -> Result<(), DockhandError> {
        let logger = logger.scoped(self.kind().log_prefix());
        let request = RemoteDeployRequest {
            host: config.ssh_host.clone(),
            user: config.ssh_user.clone(),
            auth: remote_auth(config)?,
            image_ref: config.image_ref(),
            container_name: config.container_name.clone(),
            ports: config.port_mapping(),
            env_block: config.env_block().map(str::to_string),
            volume_block: config.volume_block().map(str::to_string),
        };

        let events = self.remote.deploy(request).await?;
        drain(events, self.kind(), &logger).await?;
        Ok(())
    }
}
