//! # Flux Transport
//!
//! Update transports for the flux bot framework.
//!
//! This crate supplies the event stream itself, in two shapes:
//!
//! - **Polling** ([`polling`]) – a pull-based fetch loop over an injected
//!   `get_updates` function, with offset tracking, a time-bounded dedupe
//!   window, and cooperative cancellation
//! - **Webhook** ([`webhook`]) – a push-based callback a server hands each
//!   decoded update to
//!
//! Both deliver to the [`UpdateHandler`](flux_core::UpdateHandler) contract
//! implemented by [`Bot`](flux_core::Bot), strictly one update at a time.

pub mod dedupe;
pub mod error;
pub mod polling;
pub mod webhook;

pub use dedupe::DedupeKey;
pub use error::{FetchError, PollingError, PollingResult};
pub use polling::{
    DedupeKeyFn, DedupeOptions, GetUpdatesFn, GetUpdatesParams, PollingOptions, PollingTransport,
    UpdateIdFn, get_updates_fn, start_polling,
};
pub use webhook::{WebhookCallback, WebhookErrorHook, WebhookOptions, webhook_callback};

// the cancellation primitive is part of the public polling contract
pub use tokio_util::sync::CancellationToken;
