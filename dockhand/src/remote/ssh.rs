//! SSH CLI executor
//!
//! Runs each remote step through the system `ssh` client. Key material goes
//! to a private temp file; passwords and key passphrases are answered by an
//! askpass helper that reads them from the child's environment.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::deploy::progress::{self, ProgressEvent, ProgressStream, PROGRESS_BUFFER};
use crate::errors::DockhandError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::process::{plain_line, spawn_streaming};
use crate::remote::commands::{self, RemoteStep};
use crate::remote::{RemoteAuth, RemoteDeployRequest, RemoteExecutor};

const ASKPASS_ENV: &str = "DOCKHAND_ASKPASS";
const ASKPASS_SCRIPT: &str = "#!/bin/sh\nprintf '%s\\n' \"$DOCKHAND_ASKPASS\"\n";

/// Drives the system `ssh` binary
#[derive(Debug, Clone)]
pub struct SshCli {
    binary: String,
    connect_timeout: Duration,
}

impl SshCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            connect_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Default for SshCli {
    fn default() -> Self {
        Self::new("ssh")
    }
}

/// Split `host[:port]`
pub fn split_host_port(host: &str) -> (&str, Option<u16>) {
    match host.rsplit_once(':') {
        Some((name, port)) if !name.contains(':') => match port.parse() {
            Ok(port) => (name, Some(port)),
            Err(_) => (host, None),
        },
        _ => (host, None),
    }
}

/// Per-rollout connection state: temp files and the secret fed to askpass
struct SshSession {
    binary: String,
    connect_timeout: Duration,
    host: String,
    port: Option<u16>,
    user: String,
    temp_dir: Dir,
    key_file: Option<File>,
    askpass: Option<(File, SecretString)>,
}

impl SshSession {
    async fn open(cli: &SshCli, request: &RemoteDeployRequest) -> Result<Self, DockhandError> {
        let (host, port) = split_host_port(&request.host);
        let temp_dir = Dir::create_temp_dir("dockhand-ssh").await?;

        let mut session = Self {
            binary: cli.binary.clone(),
            connect_timeout: cli.connect_timeout,
            host: host.to_string(),
            port,
            user: request.user.clone(),
            temp_dir,
            key_file: None,
            askpass: None,
        };

        let secret = match &request.auth {
            RemoteAuth::Password(password) => Some(password.expose_secret().to_string()),
            RemoteAuth::PrivateKey { key, passphrase } => {
                let key_file = session.temp_dir.file("id_deploy");
                let mut material = key.expose_secret().trim().to_string();
                material.push('\n');
                key_file.write_string(&material).await?;
                key_file.set_mode(0o600).await?;
                session.key_file = Some(key_file);
                passphrase.as_ref().map(|p| p.expose_secret().to_string())
            }
        };

        if let Some(secret) = secret {
            let script = session.temp_dir.file("askpass.sh");
            script.write_string(ASKPASS_SCRIPT).await?;
            script.set_mode(0o700).await?;
            session.askpass = Some((script, SecretString::from(secret)));
        }

        Ok(session)
    }

    fn command(&self, remote_command: &str) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .arg("-o")
            .arg("StrictHostKeyChecking=accept-new")
            .arg("-o")
            .arg(format!("ConnectTimeout={}", self.connect_timeout.as_secs().max(1)))
            .arg("-o")
            .arg("ServerAliveInterval=15");

        if let Some(port) = self.port {
            command.arg("-p").arg(port.to_string());
        }

        match &self.key_file {
            Some(key_file) => {
                command
                    .arg("-i")
                    .arg(key_file.path())
                    .args(["-o", "IdentitiesOnly=yes", "-o", "PreferredAuthentications=publickey"]);
            }
            None => {
                command.args([
                    "-o",
                    "PreferredAuthentications=password,keyboard-interactive",
                    "-o",
                    "PubkeyAuthentication=no",
                    "-o",
                    "NumberOfPasswordPrompts=1",
                ]);
            }
        }

        match &self.askpass {
            Some((script, secret)) => {
                command
                    .env("SSH_ASKPASS", script.path())
                    .env("SSH_ASKPASS_REQUIRE", "force")
                    .env("DISPLAY", "dockhand:0")
                    .env(ASKPASS_ENV, secret.expose_secret());
            }
            None => {
                command.args(["-o", "BatchMode=yes"]);
            }
        }

        command
            .arg(format!("{}@{}", self.user, self.host))
            .arg(remote_command);
        command
    }

    /// Run one step, forwarding its output. Returns the failure message.
    async fn run(&self, step: &RemoteStep, tx: &mpsc::Sender<ProgressEvent>) -> Result<(), String> {
        debug!("Remote: {}", step.display_command());
        let mut events = spawn_streaming(
            self.command(&step.command),
            step.display_command().to_string(),
            None,
            plain_line,
        )
        .map_err(|e| e.to_string())?;

        while let Some(event) = events.next().await {
            match event {
                ProgressEvent::Error(message) => return Err(message),
                other => {
                    if tx.send(other).await.is_err() {
                        return Err("progress stream closed".to_string());
                    }
                }
            }
        }
        Ok(())
    }

    async fn close(self) {
        if let Err(e) = self.temp_dir.delete().await {
            warn!("Failed to remove ssh temp dir {}: {}", self.temp_dir.path().display(), e);
        }
    }
}

impl SshCli {
    async fn execute(self, request: RemoteDeployRequest, tx: mpsc::Sender<ProgressEvent>) {
        let session = match SshSession::open(&self, &request).await {
            Ok(session) => session,
            Err(e) => {
                let _ = tx
                    .send(ProgressEvent::Error(format!("failed to prepare ssh session: {}", e)))
                    .await;
                return;
            }
        };

        let env_file = format!("/tmp/dockhand-{}.env", Uuid::new_v4());
        let plan = commands::plan(&request, &env_file);

        let _ = tx
            .send(ProgressEvent::Log(format!(
                "Connecting to {}@{} using {} authentication",
                request.user,
                request.host,
                request.auth.kind()
            )))
            .await;

        let mut failure = None;
        let mut attempted = 0;
        for step in &plan.steps {
            if tx.is_closed() {
                break;
            }
            attempted += 1;
            let _ = tx.send(ProgressEvent::Log(step.description.clone())).await;
            if let Err(message) = session.run(step, &tx).await {
                if step.tolerate_failure {
                    let _ = tx
                        .send(ProgressEvent::Log(format!("Ignoring failure: {}", message)))
                        .await;
                } else {
                    failure = Some(message);
                    break;
                }
            }
        }

        if plan.needs_cleanup(attempted) {
            for step in &plan.cleanup {
                let _ = tx.send(ProgressEvent::Log(step.description.clone())).await;
                if let Err(message) = session.run(step, &tx).await {
                    warn!("Remote cleanup failed: {}", message);
                    let _ = tx
                        .send(ProgressEvent::Log(format!("Cleanup failed: {}", message)))
                        .await;
                }
            }
        }

        session.close().await;

        match failure {
            Some(message) => {
                let _ = tx.send(ProgressEvent::Error(message)).await;
            }
            None => {
                info!("Container {} started on {}", request.container_name, request.host);
                let _ = tx
                    .send(ProgressEvent::Log(format!(
                        "Container {} is running on {}",
                        request.container_name, request.host
                    )))
                    .await;
            }
        }
    }
}

#[async_trait]
impl RemoteExecutor for SshCli {
    async fn deploy(&self, request: RemoteDeployRequest) -> Result<ProgressStream, DockhandError> {
        info!(
            "Deploying {} to {}@{} as {}",
            request.image_ref, request.user, request.host, request.container_name
        );

        let (tx, rx) = mpsc::channel(PROGRESS_BUFFER);
        let cli = self.clone();
        tokio::spawn(cli.execute(request, tx));
        Ok(progress::from_receiver(rx))
    }
}
