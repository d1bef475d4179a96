//! # Flux
//!
//! An update-dispatch framework for conversational bot backends.
//!
//! ## Overview
//!
//! Flux routes inbound platform updates through a deterministic, composable
//! middleware pipeline, tracks per-conversation state across updates
//! (scenes and wizards), and supplies the event stream itself via a polling
//! loop with deduplication or a webhook callback.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌─────┐     ┌──────────────────────────────────────┐
//! │  Transport   │────▶│ Bot │────▶│ session → stage → router → handlers  │
//! │ (poll/hook)  │     │     │     │            (onion model)             │
//! └──────────────┘     └─────┘     └──────────────────────────────────────┘
//! ```
//!
//! - **flux-core**: compose engine, context, router, adapter contracts
//! - **flux-scenes**: session, scene, and wizard layers
//! - **flux-transport**: polling loop and webhook callback
//! - **flux-runtime**: configuration, logging, signal-driven run loop
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use flux::prelude::*;
//! use flux_adapter_mock::{MockAdapter, scripted_source};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut bot = Bot::new(MockAdapter::new());
//!     bot.hears("hi", handler_fn(|ctx| Box::pin(async move {
//!         ctx.reply("hello!").await?;
//!         Ok(())
//!     })));
//!
//!     let config = load_config()?;
//!     let runtime = FluxRuntime::new(&config, bot.into(), scripted_source(vec![]));
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub use flux_core as core;
pub use flux_runtime as runtime;
pub use flux_scenes as scenes;
pub use flux_transport as transport;

/// Prelude module for convenient imports.
pub mod prelude {
    // Core - bot assembly and dispatch
    pub use flux_core::{
        Bot, Context, DispatchError, DispatchResult, Trigger, Update, UpdateFilter, handler_fn,
        middleware_fn,
    };

    // Scenes - stateful conversations
    pub use flux_scenes::{Scene, SessionLayer, Stage, Wizard};

    // Transport - update sources
    pub use flux_transport::{
        DedupeOptions, PollingOptions, PollingTransport, get_updates_fn, start_polling,
        webhook_callback,
    };

    // Runtime - main entry point
    pub use flux_runtime::{FluxRuntime, load_config};
}
