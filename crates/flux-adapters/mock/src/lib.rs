//! # Flux Mock Adapter
//!
//! A scripted adapter for demos and tests: canonical-shape normalization,
//! replies recorded to an [`Outbox`] (and logged), and a
//! [`scripted_source`] that feeds a fixed update list through the polling
//! transport while honoring the offset watermark.
//!
//! ## Example
//!
//! ```rust,ignore
//! use flux_adapter_mock::{MockAdapter, scripted_source};
//! use serde_json::json;
//!
//! let adapter = MockAdapter::new();
//! let outbox = adapter.outbox();
//! let source = scripted_source(vec![
//!     json!({ "update_id": 1, "chat_id": 1, "message": { "text": "/start" } }),
//!     json!({ "update_id": 2, "chat_id": 1, "message": { "text": "hi" } }),
//! ]);
//! ```

pub mod adapter;
pub mod source;

pub use adapter::{MockAdapter, Outbox, SentReply};
pub use source::scripted_source;
