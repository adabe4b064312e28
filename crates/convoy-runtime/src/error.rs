//! Runtime error types.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors surfaced by a container runtime backend.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime command failed: {0}")]
    Command(String),

    #[error("runtime call timed out after {0:?}")]
    Timeout(Duration),

    #[error("instance not found: {0}")]
    InstanceNotFound(String),

    /// An existing network of the same name has an incompatible driver.
    #[error("network {name} already exists with driver {existing:?}, spec wants {requested:?}")]
    NetworkConflict {
        name: String,
        existing: String,
        requested: String,
    },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
