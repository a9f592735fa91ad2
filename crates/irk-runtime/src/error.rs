//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while bootstrapping or feeding the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Loading or validating the configuration failed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The runtime has stopped and no longer accepts events.
    #[error("Runtime event queue is closed")]
    QueueClosed,
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
