//! Error types for dockhand

use thiserror::Error;

use crate::deploy::stages::StageKind;

/// Main error type for dockhand
#[derive(Error, Debug)]
pub enum DockhandError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A submitted config or profile request is incomplete.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A pipeline stage's collaborator raised.
    #[error("{stage} stage failed: {message}")]
    StageFailure { stage: StageKind, message: String },

    /// Wrong passphrase or tampered ciphertext. Deliberately carries no detail.
    #[error("decryption failed")]
    AuthenticationFailure,

    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid job transition: {0}")]
    TransitionError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Engine error: {0}")]
    EngineError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DockhandError {
    /// Re-express any error raised while a stage was running as a failure of that stage.
    pub fn into_stage_failure(self, stage: StageKind) -> Self {
        match self {
            failure @ DockhandError::StageFailure { .. } => failure,
            other => DockhandError::StageFailure {
                stage,
                message: other.to_string(),
            },
        }
    }
}

impl From<anyhow::Error> for DockhandError {
    fn from(err: anyhow::Error) -> Self {
        DockhandError::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for DockhandError {
    fn from(err: tokio::task::JoinError) -> Self {
        DockhandError::Internal(format!("background task failed: {}", err))
    }
}
