//! Error types for rfs-swarm.

use thiserror::Error;

/// Errors surfaced by the agent runtime.
///
/// Transport and vehicle failures are recoverable by design: the agent logs
/// them, holds its last valid state, and retries on the next cycle.
#[derive(Debug, Error)]
pub enum SwarmError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config JSON error: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Proto(#[from] rfs_proto::ProtoError),

    #[error("vehicle command failed: {0}")]
    Vehicle(String),

    #[error("background task failed: {0}")]
    Task(String),

    #[error("coordination channel closed")]
    ChannelClosed,
}

/// Alias for `Result<T, SwarmError>`.
pub type SwarmResult<T> = Result<T, SwarmError>;
