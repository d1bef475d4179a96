//! Reference adapter for the canonical JSON update shape.
//!
//! Canonical updates carry `update_id`, an optional `message` (`text`,
//! `recipient.chat_id`, `sender.user_id`), an optional `callback_query`
//! (`data` or `payload`), and an optional `inline_query`. Platform adapters
//! normalize their wire formats into this shape; the [`CanonicalAdapter`]
//! turns it into the derived view the router works with.
//!
//! Outbound replies go through one of two explicitly selected backends: a
//! sender closure, or a [`ReplyHandler`] that resolves a target first.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::adapter::{Adapter, ReplyHandler, UpdateId, UpdateView};
use crate::chain::BoxFuture;
use crate::error::{AdapterError, AdapterResult};
use crate::router::parse_command;
use crate::update::Update;

/// Extracts the message text of a canonical update.
pub fn message_text(update: &Update) -> Option<&str> {
    update.payload().get("message")?.get("text")?.as_str()
}

/// Extracts the callback data of a canonical update.
///
/// Accepts `callback_query.payload` (string or `{action}` record) as well as
/// `callback_query.data`.
pub fn callback_data(update: &Update) -> Option<&str> {
    let query = update.payload().get("callback_query")?;
    if let Some(payload) = query.get("payload") {
        if let Some(data) = payload.as_str() {
            return Some(data);
        }
        if let Some(action) = payload.get("action").and_then(Value::as_str) {
            return Some(action);
        }
    }
    query.get("data").and_then(Value::as_str)
}

/// Extracts the chat id of a canonical update.
///
/// Checks the top-level `chat_id` first, then `message.recipient.chat_id`.
pub fn chat_id(update: &Update) -> Option<i64> {
    if let Some(id) = update.payload().get("chat_id").and_then(Value::as_i64) {
        return Some(id);
    }
    update
        .payload()
        .get("message")?
        .get("recipient")?
        .get("chat_id")?
        .as_i64()
}

/// Extracts the user id of a canonical update.
///
/// Checks `user_id`, then `user.user_id`, then `message.sender.user_id`.
pub fn user_id(update: &Update) -> Option<i64> {
    let payload = update.payload();
    if let Some(id) = payload.get("user_id").and_then(Value::as_i64) {
        return Some(id);
    }
    if let Some(id) = payload
        .get("user")
        .and_then(|user| user.get("user_id"))
        .and_then(Value::as_i64)
    {
        return Some(id);
    }
    payload.get("message")?.get("sender")?.get("user_id")?.as_i64()
}

/// Extracts the update id of a canonical update.
pub fn update_id(update: &Update) -> Option<UpdateId> {
    match update.payload().get("update_id")? {
        Value::Number(n) => n.as_i64().map(UpdateId::Int),
        Value::String(s) => Some(UpdateId::Str(s.clone())),
        _ => None,
    }
}

type SenderFn = Arc<
    dyn Fn(Update, String, Option<Value>) -> BoxFuture<'static, AdapterResult<Value>>
        + Send
        + Sync,
>;

enum ReplyBackend {
    Sender(SenderFn),
    Handler(Arc<dyn ReplyHandler>),
}

/// Adapter over the canonical JSON update shape.
pub struct CanonicalAdapter {
    backend: ReplyBackend,
}

impl CanonicalAdapter {
    /// Builds an adapter that replies through a sender closure.
    pub fn from_sender<F, Fut>(sender: F) -> Self
    where
        F: Fn(Update, String, Option<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AdapterResult<Value>> + Send + 'static,
    {
        let sender: SenderFn =
            Arc::new(move |update, text, extra| Box::pin(sender(update, text, extra)));
        Self {
            backend: ReplyBackend::Sender(sender),
        }
    }

    /// Builds an adapter that replies through a [`ReplyHandler`].
    pub fn with_reply_handler(handler: Arc<dyn ReplyHandler>) -> Self {
        Self {
            backend: ReplyBackend::Handler(handler),
        }
    }
}

#[async_trait]
impl Adapter for CanonicalAdapter {
    fn view(&self, update: &Update) -> UpdateView {
        let text = message_text(update).map(str::to_owned);
        let command = text.as_deref().and_then(parse_command);
        UpdateView {
            callback_data: callback_data(update).map(str::to_owned),
            command,
            chat_id: chat_id(update),
            user_id: user_id(update),
            has_message: update.payload().get("message").is_some(),
            has_callback_query: update.payload().get("callback_query").is_some(),
            has_inline_query: update.payload().get("inline_query").is_some(),
            message_text: text,
        }
    }

    async fn reply(
        &self,
        update: &Update,
        text: &str,
        extra: Option<&Value>,
    ) -> AdapterResult<Value> {
        match &self.backend {
            ReplyBackend::Sender(sender) => {
                sender(update.clone(), text.to_owned(), extra.cloned()).await
            }
            ReplyBackend::Handler(handler) => {
                let target = handler
                    .reply_target(update)
                    .ok_or(AdapterError::ReplyNotImplemented)?;
                handler.send_reply(target, text, extra).await
            }
        }
    }

    fn update_id(&self, update: &Update) -> Option<UpdateId> {
        update_id(update)
    }
}
