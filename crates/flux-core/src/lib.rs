//! # Flux Core
//!
//! The dispatch core of the flux bot framework.
//!
//! This crate provides the building blocks for routing inbound platform
//! updates through a deterministic, composable middleware pipeline.
//!
//! ## Architecture Layers
//!
//! ### Foundation Layer
//!
//! - **Updates**: opaque platform payloads ([`Update`], [`UpdateId`])
//! - **Adapter contracts**: normalization + outbound replies ([`Adapter`],
//!   [`ReplyHandler`], [`CanonicalAdapter`])
//! - **Session state model**: typed per-conversation records
//!   ([`SessionData`], [`SceneState`], [`WizardState`])
//!
//! ### Engine Layer
//!
//! - **Compose engine**: onion-model middleware dispatch ([`Chain`],
//!   [`Middleware`], [`Next`])
//! - **Context**: the per-update mutable object ([`Context`])
//! - **Router**: declarative filter/trigger operators ([`router::on`],
//!   [`router::hears`], [`router::action`], [`router::command`])
//! - **Bot**: middleware registry and dispatch entry point ([`Bot`])
//!
//! ## Dispatch Flow
//!
//! ```text
//! ┌───────────┐     ┌───────────┐     ┌─────────────────────────────┐
//! │ Transport │────▶│    Bot    │────▶│ middleware → middleware → … │
//! │ (polling) │     │ (context) │     │        (onion model)        │
//! └───────────┘     └───────────┘     └─────────────────────────────┘
//! ```
//!
//! Updates are processed strictly one at a time, in arrival order; the
//! context is exclusively owned by each dispatch call, so middleware mutate
//! it without locks.
//!
//! ## Example
//!
//! ```rust,ignore
//! use flux_core::{Bot, CanonicalAdapter, handler_fn};
//!
//! let adapter = CanonicalAdapter::from_sender(|update, text, _extra| async move {
//!     // deliver `text` to the platform
//!     Ok(serde_json::Value::Null)
//! });
//!
//! let mut bot = Bot::new(adapter);
//! bot.hears("hi", handler_fn(|ctx| Box::pin(async move {
//!     ctx.reply("hello!").await?;
//!     Ok(())
//! })));
//! ```

pub mod adapter;
pub mod bot;
pub mod canonical;
pub mod chain;
pub mod context;
pub mod error;
pub mod router;
pub mod state;
pub mod update;

pub use adapter::{
    Adapter, BoxedAdapter, ParsedCommand, ReplyHandler, ReplyTarget, UpdateHandler, UpdateId,
    UpdateView,
};
pub use bot::{Bot, ErrorHandlerFn};
pub use canonical::CanonicalAdapter;
pub use chain::{ArcMiddleware, BoxFuture, Chain, Middleware, Next, handler_fn, middleware_fn};
pub use context::{Context, SceneCursor, WizardCursor};
pub use error::{AdapterError, AdapterResult, DispatchError, DispatchResult, HandlerError};
pub use router::{
    IntoCommands, IntoFilters, IntoStack, IntoTriggers, Trigger, UpdateFilter, compose,
    parse_command,
};
pub use state::{SceneState, SessionData, WizardState};
pub use update::Update;

/// Prelude for common imports.
pub mod prelude {
    pub use super::bot::Bot;
    pub use super::chain::{ArcMiddleware, BoxFuture, Chain, Middleware, Next, handler_fn, middleware_fn};
    pub use super::context::Context;
    pub use super::error::{DispatchError, DispatchResult};
    pub use super::router::{Trigger, UpdateFilter};
    pub use super::update::Update;
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use parking_lot::Mutex;
    use serde_json::{Value, json};

    use crate::adapter::BoxedAdapter;
    use crate::canonical::CanonicalAdapter;
    use crate::chain::{ArcMiddleware, Chain, middleware_fn};
    use crate::context::Context;
    use crate::error::DispatchResult;
    use crate::update::Update;

    /// Adapter whose replies all resolve to `Null`.
    pub(crate) fn noop_adapter() -> BoxedAdapter {
        Arc::new(CanonicalAdapter::from_sender(|_update, _text, _extra| async {
            Ok(Value::Null)
        }))
    }

    /// Context over an empty canonical update.
    pub(crate) fn noop_context() -> Context {
        canonical_context(json!({}))
    }

    /// Context over the given canonical payload.
    pub(crate) fn canonical_context(payload: Value) -> Context {
        Context::new(Update::new(payload), noop_adapter())
    }

    /// Middleware that records `{name}:before` / `{name}:after` around `next`.
    pub(crate) fn trace_middleware(
        name: &'static str,
        trace: &Arc<Mutex<Vec<String>>>,
    ) -> ArcMiddleware {
        let trace = Arc::clone(trace);
        middleware_fn(move |ctx, next| {
            let trace = Arc::clone(&trace);
            Box::pin(async move {
                trace.lock().push(format!("{name}:before"));
                let result = next.run(ctx).await;
                trace.lock().push(format!("{name}:after"));
                result
            })
        })
    }

    /// Runs one middleware as the root of a fresh chain.
    pub(crate) async fn run_root(middleware: &ArcMiddleware, ctx: &mut Context) -> DispatchResult<()> {
        Chain::new(vec![Arc::clone(middleware)]).run(ctx).await
    }
}
