//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;
use flux_transport::PollingError;

/// Errors that can occur during runtime operations.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Configuration loading failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The polling transport failed.
    #[error(transparent)]
    Polling(#[from] PollingError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
