//! Remote execution collaborator
//!
//! Rolls an image out on a remote host over a remote shell.

pub mod commands;
pub mod ssh;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::deploy::progress::ProgressStream;
use crate::errors::DockhandError;

/// How to authenticate the remote shell session
#[derive(Debug)]
pub enum RemoteAuth {
    Password(SecretString),
    PrivateKey {
        key: SecretString,
        passphrase: Option<SecretString>,
    },
}

impl RemoteAuth {
    pub fn kind(&self) -> &'static str {
        match self {
            RemoteAuth::Password(_) => "password",
            RemoteAuth::PrivateKey { .. } => "private key",
        }
    }
}

/// One remote rollout
#[derive(Debug)]
pub struct RemoteDeployRequest {
    pub host: String,
    pub user: String,
    pub auth: RemoteAuth,
    pub image_ref: String,
    pub container_name: String,
    /// `(host, container)`
    pub ports: Option<(u16, u16)>,
    /// Newline separated `KEY=VALUE` lines
    pub env_block: Option<String>,
    /// Newline separated bind mount specs
    pub volume_block: Option<String>,
}

#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Pull, replace and start the container on the remote host.
    ///
    /// The stream ends with an [`Error`] event when any remote command exits
    /// non-zero, naming the command and its exit code.
    ///
    /// [`Error`]: crate::deploy::progress::ProgressEvent::Error
    async fn deploy(&self, request: RemoteDeployRequest) -> Result<ProgressStream, DockhandError>;
}
