//! Mock adapter: canonical-shape normalization with recorded replies.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::info;

use flux_core::canonical;
use flux_core::{
    Adapter, AdapterResult, CanonicalAdapter, ReplyHandler, ReplyTarget, Update, UpdateId,
    UpdateView,
};

/// One recorded outbound reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentReply {
    /// Destination chat.
    pub chat_id: i64,
    /// Reply text.
    pub text: String,
}

/// Recorded outbound replies, shared with test assertions.
#[derive(Default)]
pub struct Outbox {
    entries: Mutex<Vec<SentReply>>,
}

impl Outbox {
    /// Returns a snapshot of the recorded replies.
    pub fn entries(&self) -> Vec<SentReply> {
        self.entries.lock().clone()
    }

    /// Returns the number of recorded replies.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if nothing was sent.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn push(&self, reply: SentReply) {
        self.entries.lock().push(reply);
    }
}

struct MockReplyHandler {
    outbox: Arc<Outbox>,
}

#[async_trait]
impl ReplyHandler for MockReplyHandler {
    fn reply_target(&self, update: &Update) -> Option<ReplyTarget> {
        // scripted updates without a chat land in a default one
        let chat_id = canonical::chat_id(update).unwrap_or(1);
        Some(ReplyTarget { chat_id })
    }

    async fn send_reply(
        &self,
        target: ReplyTarget,
        text: &str,
        _extra: Option<&Value>,
    ) -> AdapterResult<Value> {
        info!(chat_id = target.chat_id, text = %text, "mock reply");
        self.outbox.push(SentReply {
            chat_id: target.chat_id,
            text: text.to_owned(),
        });
        Ok(Value::Null)
    }
}

/// Canonical-shape adapter whose replies are logged and recorded.
pub struct MockAdapter {
    inner: CanonicalAdapter,
    outbox: Arc<Outbox>,
}

impl MockAdapter {
    /// Creates a mock adapter with an empty outbox.
    pub fn new() -> Self {
        let outbox = Arc::new(Outbox::default());
        let handler = Arc::new(MockReplyHandler {
            outbox: Arc::clone(&outbox),
        });
        Self {
            inner: CanonicalAdapter::with_reply_handler(handler),
            outbox,
        }
    }

    /// Returns a handle to the recorded replies.
    pub fn outbox(&self) -> Arc<Outbox> {
        Arc::clone(&self.outbox)
    }
}

impl Default for MockAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for MockAdapter {
    fn view(&self, update: &Update) -> UpdateView {
        self.inner.view(update)
    }

    async fn reply(
        &self,
        update: &Update,
        text: &str,
        extra: Option<&Value>,
    ) -> AdapterResult<Value> {
        self.inner.reply(update, text, extra).await
    }

    fn update_id(&self, update: &Update) -> Option<UpdateId> {
        self.inner.update_id(update)
    }
}
