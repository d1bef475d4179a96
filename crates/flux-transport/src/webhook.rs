//! Push-based webhook callback.
//!
//! The HTTP server wiring lives outside this crate; a [`WebhookCallback`] is
//! the piece a server hands each decoded update to. Dispatch errors are
//! routed to an optional async hook instead of surfacing, when configured.

use std::sync::Arc;

use tracing::warn;

use flux_core::{BoxFuture, DispatchError, DispatchResult, Update, UpdateHandler};

/// Async hook invoked with dispatch failures.
pub type WebhookErrorHook =
    Arc<dyn Fn(DispatchError, Update) -> BoxFuture<'static, ()> + Send + Sync>;

/// Webhook callback configuration.
#[derive(Clone, Default)]
pub struct WebhookOptions {
    /// When set, receives dispatch errors instead of the caller.
    pub on_error: Option<WebhookErrorHook>,
}

impl WebhookOptions {
    /// Installs the error hook (builder form).
    pub fn with_on_error<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(DispatchError, Update) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        self.on_error = Some(Arc::new(move |err, update| Box::pin(hook(err, update))));
        self
    }
}

/// Push entry point: feeds one decoded update into the bot.
pub struct WebhookCallback {
    handler: Arc<dyn UpdateHandler>,
    options: WebhookOptions,
}

/// Builds a webhook callback over an update handler.
pub fn webhook_callback(handler: Arc<dyn UpdateHandler>, options: WebhookOptions) -> WebhookCallback {
    WebhookCallback { handler, options }
}

impl WebhookCallback {
    /// Dispatches one update.
    ///
    /// On dispatch failure the configured `on_error` hook is awaited and the
    /// call resolves cleanly; without a hook the error surfaces.
    pub async fn call(&self, update: Update) -> DispatchResult<()> {
        match self.handler.handle_update(update.clone()).await {
            Ok(()) => Ok(()),
            Err(err) => match &self.options.on_error {
                Some(hook) => {
                    warn!(error = %err, "webhook dispatch failed, routed to error hook");
                    hook(err, update).await;
                    Ok(())
                }
                None => Err(err),
            },
        }
    }
}
