//! Adapter contracts bridging platform payloads with the dispatch core.
//!
//! An [`Adapter`] normalizes a raw [`Update`] into the derived fields the
//! router and context work with, and performs outbound replies. Adapters are
//! selected explicitly at construction time; the core never probes object
//! shapes at runtime to decide what it was given.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{AdapterResult, DispatchResult};
use crate::update::Update;

/// A platform-level update identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UpdateId {
    /// Numeric identifier (monotonic on most platforms).
    Int(i64),
    /// String identifier.
    Str(String),
}

impl UpdateId {
    /// Returns the numeric form, if this id is numeric.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(id) => Some(*id),
            Self::Str(_) => None,
        }
    }
}

impl std::fmt::Display for UpdateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Str(id) => write!(f, "{id}"),
        }
    }
}

/// A command token parsed out of message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Command name without the leading `/` or `@botname` suffix.
    pub name: String,
    /// Trimmed remainder of the text after the command token.
    pub payload: String,
}

/// Adapter-derived view of one update.
///
/// Built once per update when the [`Context`](crate::Context) is created.
#[derive(Debug, Clone, Default)]
pub struct UpdateView {
    /// Text of the inbound message, if any.
    pub message_text: Option<String>,
    /// Data attached to an inbound callback action, if any.
    pub callback_data: Option<String>,
    /// Command parsed out of the message text, if any.
    pub command: Option<ParsedCommand>,
    /// Chat the update belongs to, if resolvable.
    pub chat_id: Option<i64>,
    /// User the update originates from, if resolvable.
    pub user_id: Option<i64>,
    /// Whether the update carries a message.
    pub has_message: bool,
    /// Whether the update carries a callback action.
    pub has_callback_query: bool,
    /// Whether the update carries an inline query.
    pub has_inline_query: bool,
}

/// Platform adapter: normalizes updates and performs outbound replies.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Derives the per-update view the context exposes.
    fn view(&self, update: &Update) -> UpdateView;

    /// Sends a text reply for the given update.
    ///
    /// When no reply target can be resolved for the update shape, returns
    /// [`AdapterError::ReplyNotImplemented`](crate::AdapterError::ReplyNotImplemented).
    async fn reply(
        &self,
        update: &Update,
        text: &str,
        extra: Option<&Value>,
    ) -> AdapterResult<Value>;

    /// Extracts the platform update id used for offset tracking and dedupe.
    fn update_id(&self, update: &Update) -> Option<UpdateId>;
}

/// A shared, type-erased adapter.
pub type BoxedAdapter = Arc<dyn Adapter>;

/// Where a reply should be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyTarget {
    /// Destination chat.
    pub chat_id: i64,
}

/// Split reply capability: resolve a target from an update, then send to it.
///
/// Adapters that only know how to send (but not how to normalize updates)
/// implement this and get wrapped by
/// [`CanonicalAdapter`](crate::CanonicalAdapter).
#[async_trait]
pub trait ReplyHandler: Send + Sync {
    /// Resolves the reply target for an update, if the shape allows it.
    fn reply_target(&self, update: &Update) -> Option<ReplyTarget>;

    /// Sends a text reply to the resolved target.
    async fn send_reply(
        &self,
        target: ReplyTarget,
        text: &str,
        extra: Option<&Value>,
    ) -> AdapterResult<Value>;
}

/// Entry point transports use to feed updates into a bot.
#[async_trait]
pub trait UpdateHandler: Send + Sync {
    /// Dispatches one update through the bot's middleware chain.
    async fn handle_update(&self, update: Update) -> DispatchResult<()>;
}
