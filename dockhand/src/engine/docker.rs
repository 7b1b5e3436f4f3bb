//! Docker CLI engine

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use secrecy::{ExposeSecret, SecretString};
use tokio::process::Command;
use tracing::{debug, info};

use crate::deploy::progress::{from_events, until_error, ProgressEvent, ProgressStream};
use crate::engine::{BuildRequest, ContainerEngine};
use crate::errors::DockhandError;
use crate::process::{plain_line, spawn_streaming, succeeds};

/// Drives the local `docker` binary
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn command(&self) -> Command {
        Command::new(&self.binary)
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

/// Build output classifier: picks image ids out of the classic and BuildKit output.
pub fn classify_build_line(line: String) -> ProgressEvent {
    if let Some(id) = parse_image_id(&line) {
        return ProgressEvent::ImageId(id);
    }
    if line.trim_start().starts_with("ERROR:") {
        return ProgressEvent::Error(line.trim().to_string());
    }
    ProgressEvent::Log(line)
}

/// Push output classifier: registry refusals abort the push.
pub fn classify_push_line(line: String) -> ProgressEvent {
    let lowered = line.trim_start().to_ascii_lowercase();
    if lowered.starts_with("denied:")
        || lowered.starts_with("unauthorized:")
        || lowered.starts_with("error")
        || lowered.contains("error response from daemon")
    {
        return ProgressEvent::Error(line.trim().to_string());
    }
    ProgressEvent::Status(line)
}

fn parse_image_id(line: &str) -> Option<String> {
    if let Some(rest) = line.split("Successfully built ").nth(1) {
        return rest.split_whitespace().next().map(str::to_string);
    }
    if let Some(rest) = line.split("writing image ").nth(1) {
        return rest
            .split_whitespace()
            .next()
            .filter(|id| id.starts_with("sha256:"))
            .map(str::to_string);
    }
    None
}

/// Forward login output as it arrives, then start the push once login has
/// succeeded. A login failure ends the feed and the push never starts.
pub fn push_after_login(login: ProgressStream, push: BoxFuture<'static, ProgressStream>) -> ProgressStream {
    let login = login.map(|event| match event {
        ProgressEvent::Error(message) => ProgressEvent::Error(format!("registry login failed: {}", message)),
        other => other,
    });
    let push = stream::once(push).flatten();
    until_error(login.chain(push).boxed())
}

#[async_trait]
impl ContainerEngine for DockerCli {
    async fn build(&self, request: BuildRequest) -> Result<ProgressStream, DockhandError> {
        info!("Building image {} in {}", request.image_ref, request.context_dir.display());

        let mut command = self.command();
        command
            .current_dir(&request.context_dir)
            .env("BUILDKIT_PROGRESS", "plain")
            .args(["build", "-t", &request.image_ref]);

        if let Some(platform) = &request.platform {
            command.args(["--platform", platform]);
        }
        if let Some(dockerfile) = &request.dockerfile {
            command.arg("-f").arg(dockerfile);
        }
        command.arg(".");

        spawn_streaming(
            command,
            format!("{} build -t {}", self.binary, request.image_ref),
            None,
            classify_build_line,
        )
    }

    async fn push(
        &self,
        image_ref: &str,
        username: &str,
        password: SecretString,
    ) -> Result<ProgressStream, DockhandError> {
        debug!("Logging in to registry as {}", username);

        let mut login = self.command();
        login.args(["login", "-u", username, "--password-stdin"]);
        let login_events = spawn_streaming(
            login,
            format!("{} login -u {}", self.binary, username),
            Some(password.expose_secret().to_string()),
            plain_line,
        )?;

        let binary = self.binary.clone();
        let image_ref = image_ref.to_string();
        let push = async move {
            info!("Pushing image {}", image_ref);
            let mut command = Command::new(&binary);
            command.args(["push", &image_ref]);
            let label = format!("{} push {}", binary, image_ref);
            spawn_streaming(command, label, None, classify_push_line)
                .unwrap_or_else(|e| from_events(vec![ProgressEvent::Error(e.to_string())]))
        };

        Ok(push_after_login(login_events, push.boxed()))
    }

    async fn image_exists(&self, image_ref: &str) -> Result<bool, DockhandError> {
        let mut command = self.command();
        command.args(["image", "inspect", image_ref]);
        succeeds(command).await
    }

    async fn tag(&self, source: &str, target: &str) -> Result<(), DockhandError> {
        debug!("Tagging {} as {}", source, target);
        let mut command = self.command();
        command.args(["tag", source, target]);
        if succeeds(command).await? {
            Ok(())
        } else {
            Err(DockhandError::EngineError(format!(
                "failed to tag {} as {}",
                source, target
            )))
        }
    }
}
