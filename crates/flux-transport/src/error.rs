//! Transport error types.

use thiserror::Error;

use flux_core::DispatchError;

/// An opaque failure raised by an injected `get_updates` function.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct FetchError(Box<dyn std::error::Error + Send + Sync>);

impl FetchError {
    /// Wraps an arbitrary source error.
    pub fn new(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self(err.into())
    }

    /// Wraps a plain message.
    pub fn message(msg: impl Into<String>) -> Self {
        Self(msg.into().into())
    }
}

/// Errors terminating the polling transport.
#[derive(Debug, Error)]
pub enum PollingError {
    /// `start` was called on a transport that already ran.
    #[error("polling transport already started")]
    AlreadyStarted,

    /// The injected `get_updates` function failed outside cancellation.
    ///
    /// Not retried inside the transport; retry policy belongs to the caller.
    #[error("update fetch failed: {0}")]
    Fetch(FetchError),

    /// An update's dispatch failed with no bot-level handler to absorb it.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The loop task itself failed (panic or runtime shutdown).
    #[error("polling loop task failed: {0}")]
    Task(String),
}

/// Result type for polling operations.
pub type PollingResult<T> = Result<T, PollingError>;
