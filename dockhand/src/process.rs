//! Child process streaming
//!
//! Runs an external command and forwards its stdout and stderr lines as
//! [`ProgressEvent`]s while it is still running. A non-zero exit becomes a
//! final [`ProgressEvent::Error`] naming the command and its exit code.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::deploy::progress::{self, ProgressEvent, ProgressStream, PROGRESS_BUFFER};
use crate::errors::DockhandError;

/// Maps one output line to an event
pub type LineClassifier = fn(String) -> ProgressEvent;

/// Every line is a plain log line
pub fn plain_line(line: String) -> ProgressEvent {
    ProgressEvent::Log(line)
}

/// Spawn `command` and stream its output.
///
/// `label` is the command text reported when the process fails. `stdin`,
/// when given, is written to the child and the pipe closed. Dropping the
/// returned stream kills the child.
pub fn spawn_streaming(
    mut command: Command,
    label: String,
    stdin: Option<String>,
    classify: LineClassifier,
) -> Result<ProgressStream, DockhandError> {
    command
        .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .map_err(|e| DockhandError::EngineError(format!("failed to run {}: {}", label, e)))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let stdin_pipe = child.stdin.take();
    let (tx, rx) = mpsc::channel(PROGRESS_BUFFER);

    tokio::spawn(async move {
        if let (Some(input), Some(mut pipe)) = (stdin, stdin_pipe) {
            if let Err(e) = pipe.write_all(input.as_bytes()).await {
                warn!("Failed to write stdin of {}: {}", label, e);
            }
            drop(pipe);
        }

        let out_tx = tx.clone();
        let forward_stdout = async move {
            if let Some(stdout) = stdout {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if out_tx.send(classify(line)).await.is_err() {
                        break;
                    }
                }
            }
        };

        let err_tx = tx.clone();
        let forward_stderr = async move {
            let mut last_line: Option<String> = None;
            if let Some(stderr) = stderr {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if !line.trim().is_empty() {
                        last_line = Some(line.trim().to_string());
                    }
                    if err_tx.send(classify(line)).await.is_err() {
                        break;
                    }
                }
            }
            last_line
        };

        let ((), last_stderr) = tokio::join!(forward_stdout, forward_stderr);

        if tx.is_closed() {
            debug!("Progress stream for {} dropped, killing process", label);
            let _ = child.kill().await;
            return;
        }

        match child.wait().await {
            Ok(status) if status.success() => {}
            Ok(status) => {
                let code = status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string());
                let mut message = format!("command `{}` exited with code {}", label, code);
                if let Some(detail) = last_stderr {
                    message.push_str(": ");
                    message.push_str(&detail);
                }
                let _ = tx.send(ProgressEvent::Error(message)).await;
            }
            Err(e) => {
                let _ = tx
                    .send(ProgressEvent::Error(format!("failed to wait for {}: {}", label, e)))
                    .await;
            }
        }
    });

    Ok(progress::from_receiver(rx))
}

/// Run a command to completion and report whether it exited successfully.
pub async fn succeeds(mut command: Command) -> Result<bool, DockhandError> {
    let status = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await?;
    Ok(status.success())
}
