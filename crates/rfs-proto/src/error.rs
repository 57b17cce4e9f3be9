//! Error types for rfs-proto.

use thiserror::Error;

/// Errors that can occur encoding or decoding coordination messages.
#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("message JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Alias for `Result<T, ProtoError>`.
pub type ProtoResult<T> = Result<T, ProtoError>;
