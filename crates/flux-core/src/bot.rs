//! Bot: middleware registry and per-update dispatch entry point.
//!
//! A [`Bot`] owns an ordered middleware list and a lazily rebuilt composed
//! [`Chain`]. Registration happens through `&mut self` while the bot is
//! being assembled; dispatch takes `&self`, so the finished bot can be
//! shared behind an `Arc` with transports. Updates are processed one at a
//! time in arrival order — the transports await full dispatch before
//! fetching more.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, error};

use crate::adapter::{Adapter, BoxedAdapter, UpdateHandler};
use crate::chain::{ArcMiddleware, BoxFuture, Chain};
use crate::context::Context;
use crate::error::{DispatchError, DispatchResult};
use crate::router;
use crate::router::{IntoCommands, IntoFilters, IntoStack, IntoTriggers};
use crate::update::Update;

/// Bot-level error handler.
///
/// Receives the dispatch error and the context of the failed update; its
/// return value becomes the result of
/// [`handle_update`](Bot::handle_update).
pub type ErrorHandlerFn = Arc<
    dyn for<'a> Fn(DispatchError, &'a mut Context) -> BoxFuture<'a, DispatchResult<()>>
        + Send
        + Sync,
>;

/// A conversational bot: adapter + middleware pipeline.
pub struct Bot {
    adapter: BoxedAdapter,
    stack: Vec<ArcMiddleware>,
    // rebuilt on the next dispatch after any registration
    composed: Mutex<Option<Chain>>,
    error_handler: Option<ErrorHandlerFn>,
}

impl Bot {
    /// Creates a bot with the given adapter.
    pub fn new(adapter: impl Adapter + 'static) -> Self {
        Self::with_adapter(Arc::new(adapter))
    }

    /// Creates a bot with a shared adapter.
    pub fn with_adapter(adapter: BoxedAdapter) -> Self {
        Self {
            adapter,
            stack: Vec::new(),
            composed: Mutex::new(None),
            error_handler: None,
        }
    }

    /// Returns the adapter.
    pub fn adapter(&self) -> &BoxedAdapter {
        &self.adapter
    }

    /// Returns the number of registered middleware.
    pub fn middleware_count(&self) -> usize {
        self.stack.len()
    }

    /// Appends middleware to the pipeline.
    ///
    /// Invalidates the composed chain; it is rebuilt on the next dispatch.
    pub fn use_middleware(&mut self, middleware: impl IntoStack) -> &mut Self {
        self.stack.extend(middleware.into_stack());
        *self.composed.lock() = None;
        self
    }

    /// Registers an event-class route (see [`router::on`]).
    pub fn on(&mut self, filters: impl IntoFilters, handlers: impl IntoStack) -> &mut Self {
        self.use_middleware(router::on(filters, handlers))
    }

    /// Registers a text-trigger route (see [`router::hears`]).
    pub fn hears(&mut self, triggers: impl IntoTriggers, handlers: impl IntoStack) -> &mut Self {
        self.use_middleware(router::hears(triggers, handlers))
    }

    /// Registers a callback-trigger route (see [`router::action`]).
    pub fn action(&mut self, triggers: impl IntoTriggers, handlers: impl IntoStack) -> &mut Self {
        self.use_middleware(router::action(triggers, handlers))
    }

    /// Registers a slash-command route (see [`router::command`]).
    pub fn command(&mut self, commands: impl IntoCommands, handlers: impl IntoStack) -> &mut Self {
        self.use_middleware(router::command(commands, handlers))
    }

    /// Registers a `/start` route.
    pub fn start(&mut self, handlers: impl IntoStack) -> &mut Self {
        self.command("start", handlers)
    }

    /// Registers a `/help` route.
    pub fn help(&mut self, handlers: impl IntoStack) -> &mut Self {
        self.command("help", handlers)
    }

    /// Installs the bot-level error handler.
    pub fn on_error<F>(&mut self, handler: F) -> &mut Self
    where
        F: for<'a> Fn(DispatchError, &'a mut Context) -> BoxFuture<'a, DispatchResult<()>>
            + Send
            + Sync
            + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    fn composed(&self) -> Chain {
        let mut slot = self.composed.lock();
        slot.get_or_insert_with(|| Chain::new(self.stack.clone()))
            .clone()
    }

    /// Dispatches one update through the middleware pipeline.
    ///
    /// Handler errors propagate unless an error handler is registered, in
    /// which case its return value becomes the result of this call.
    pub async fn handle_update(&self, update: Update) -> DispatchResult<()> {
        let chain = self.composed();
        let mut ctx = Context::new(update, Arc::clone(&self.adapter));
        debug!(middleware = chain.len(), "dispatching update");

        match chain.run(&mut ctx).await {
            Ok(()) => Ok(()),
            Err(err) => match &self.error_handler {
                Some(handler) => handler(err, &mut ctx).await,
                None => {
                    error!(error = %err, "unhandled dispatch error");
                    Err(err)
                }
            },
        }
    }
}

#[async_trait]
impl UpdateHandler for Bot {
    async fn handle_update(&self, update: Update) -> DispatchResult<()> {
        Bot::handle_update(self, update).await
    }
}

impl std::fmt::Debug for Bot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bot")
            .field("middleware_count", &self.stack.len())
            .field("has_error_handler", &self.error_handler.is_some())
            .finish()
    }
}
