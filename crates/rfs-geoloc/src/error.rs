//! Error types for rfs-geoloc.
//!
//! Insufficient data and solver non-convergence are *not* errors — those
//! return `None` from the solvers.  This enum covers registry persistence
//! only.

use thiserror::Error;

/// Errors that can occur loading or saving the receiver registry.
#[derive(Debug, Error)]
pub enum GeolocError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("registry JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Alias for `Result<T, GeolocError>`.
pub type GeolocResult<T> = Result<T, GeolocError>;
