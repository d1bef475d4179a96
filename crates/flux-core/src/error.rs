//! Unified error types for the flux dispatch core.
//!
//! This module provides the standardized error types used across core
//! components. Transport-level errors are defined in `flux-transport`.

use thiserror::Error;

// =============================================================================
// Dispatch Errors
// =============================================================================

/// Errors surfaced while dispatching one update through the middleware chain.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A middleware invoked its `next` continuation more than once.
    ///
    /// This signals a bug in user-supplied middleware and is never retried.
    #[error("next() called multiple times")]
    NextCalledMultipleTimes,

    /// A session consumer ran before the session middleware.
    #[error("session middleware must run before {consumer}")]
    SessionRequired {
        /// The component that needed the session.
        consumer: &'static str,
    },

    /// The wizard step API was used outside an active wizard turn.
    #[error("stage middleware with an active wizard is required for step control")]
    StageRequired,

    /// Adapter-level failure (reply resolution, outbound send).
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// Failure raised by user middleware.
    #[error(transparent)]
    Handler(#[from] HandlerError),
}

impl DispatchError {
    /// Wraps an arbitrary error raised by user middleware.
    pub fn handler<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Handler(HandlerError(Box::new(err)))
    }

    /// Wraps a plain message raised by user middleware.
    pub fn message(msg: impl Into<String>) -> Self {
        Self::Handler(HandlerError(msg.into().into()))
    }
}

/// An opaque error produced by user-supplied middleware.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HandlerError(Box<dyn std::error::Error + Send + Sync>);

// =============================================================================
// Adapter Errors
// =============================================================================

/// Errors that can occur in adapter operations.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// No reply target could be resolved for this update shape.
    ///
    /// This is a well-defined sentinel so callers can branch on it instead
    /// of treating every reply failure as a crash.
    #[error("reply is not implemented for this update shape")]
    ReplyNotImplemented,

    /// The outbound send failed.
    #[error("failed to send reply: {0}")]
    SendFailed(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Result type for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;
