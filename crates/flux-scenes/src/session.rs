//! Session middleware: a persistent per-conversation record.
//!
//! The [`SessionLayer`] derives a key for each update, checks the entry out
//! of a pluggable [`SessionStore`], attaches it to the context, and commits
//! it back once the rest of the chain has run. Processing is strictly
//! sequential per bot instance, so no locking is needed beyond what the
//! store itself does; a pluggable backend must not mutate entries
//! concurrently from outside the dispatch sequence.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use flux_core::{ArcMiddleware, BoxFuture, Context, DispatchResult, Middleware, Next, SessionData};

/// Pluggable session storage.
pub trait SessionStore: Send + Sync {
    /// Loads the entry for a key, if present.
    fn load(&self, key: &str) -> Option<SessionData>;

    /// Stores the entry for a key.
    fn save(&self, key: &str, data: SessionData);
}

/// Default in-memory store.
///
/// Entries live for the lifetime of the store and are never evicted;
/// unbounded growth is a known limitation of this backend.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, SessionData>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl SessionStore for MemoryStore {
    fn load(&self, key: &str) -> Option<SessionData> {
        self.entries.lock().get(key).cloned()
    }

    fn save(&self, key: &str, data: SessionData) {
        self.entries.lock().insert(key.to_owned(), data);
    }
}

/// Custom session-key derivation.
pub type SessionKeyFn = Arc<dyn Fn(&Context) -> Option<String> + Send + Sync>;

/// Factory for fresh session entries.
pub type SessionSeedFn = Arc<dyn Fn() -> SessionData + Send + Sync>;

/// Session middleware.
///
/// Register it before any stage or wizard middleware: both fail with a
/// configuration error when the session slot is empty.
pub struct SessionLayer {
    store: Arc<dyn SessionStore>,
    key_fn: Option<SessionKeyFn>,
    seed: Option<SessionSeedFn>,
    fallback_key: String,
}

impl SessionLayer {
    /// Creates a session layer backed by a fresh [`MemoryStore`].
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            key_fn: None,
            seed: None,
            fallback_key: "global".to_owned(),
        }
    }

    /// Uses a custom store backend.
    pub fn with_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = store;
        self
    }

    /// Uses a custom key derivation, tried before the built-in ladder.
    pub fn with_key_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&Context) -> Option<String> + Send + Sync + 'static,
    {
        self.key_fn = Some(Arc::new(f));
        self
    }

    /// Uses a custom factory for fresh entries.
    pub fn with_seed<F>(mut self, f: F) -> Self
    where
        F: Fn() -> SessionData + Send + Sync + 'static,
    {
        self.seed = Some(Arc::new(f));
        self
    }

    /// Overrides the fallback key used when no identifiers are available.
    pub fn with_fallback_key(mut self, key: impl Into<String>) -> Self {
        self.fallback_key = key.into();
        self
    }

    /// Returns a handle to the store backend.
    pub fn store(&self) -> Arc<dyn SessionStore> {
        Arc::clone(&self.store)
    }

    /// Wraps this layer as a registrable middleware.
    pub fn middleware(self) -> ArcMiddleware {
        Arc::new(self)
    }

    /// Derives the session key for an update.
    ///
    /// Custom derivation first, then `chatId:userId`, then `chatId`, then
    /// `userId`, then the fallback key.
    pub fn resolve_key(&self, ctx: &Context) -> String {
        if let Some(key_fn) = &self.key_fn
            && let Some(key) = key_fn(ctx)
            && !key.is_empty()
        {
            return key;
        }

        match (ctx.chat_id(), ctx.user_id()) {
            (Some(chat), Some(user)) => format!("{chat}:{user}"),
            (Some(chat), None) => chat.to_string(),
            (None, Some(user)) => user.to_string(),
            (None, None) => self.fallback_key.clone(),
        }
    }
}

impl Default for SessionLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware for SessionLayer {
    fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, DispatchResult<()>> {
        Box::pin(async move {
            let key = self.resolve_key(ctx);
            let entry = self.store.load(&key).unwrap_or_else(|| match &self.seed {
                Some(seed) => seed(),
                None => SessionData::new(),
            });
            trace!(key = %key, "session attached");
            ctx.attach_session(entry);

            let result = next.run(ctx).await;

            // committed even when downstream failed: mutations made before
            // the failure are already part of the conversation state
            if let Some(data) = ctx.take_session() {
                self.store.save(&key, data);
            }
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flux_core::{Bot, CanonicalAdapter, Update, handler_fn};
    use serde_json::{Value, json};

    fn bot_with_session(store: Arc<MemoryStore>) -> Bot {
        let mut bot = Bot::new(CanonicalAdapter::from_sender(|_, _, _| async {
            Ok(Value::Null)
        }));
        bot.use_middleware(
            SessionLayer::new()
                .with_store(store as Arc<dyn SessionStore>)
                .middleware(),
        );
        bot
    }

    fn keyed_update(chat: i64, user: i64, text: &str) -> Update {
        Update::new(json!({
            "chat_id": chat,
            "user_id": user,
            "message": { "text": text }
        }))
    }

    #[tokio::test]
    async fn persists_mutations_across_updates() {
        let store = Arc::new(MemoryStore::new());
        let mut bot = bot_with_session(Arc::clone(&store));
        bot.use_middleware(handler_fn(|ctx| {
            Box::pin(async move {
                let session = ctx.session_mut()?;
                let count = session.get("count").and_then(Value::as_i64).unwrap_or(0);
                session.insert("count", json!(count + 1));
                Ok(())
            })
        }));

        bot.handle_update(keyed_update(1, 2, "a")).await.unwrap();
        bot.handle_update(keyed_update(1, 2, "b")).await.unwrap();

        let entry = store.load("1:2").unwrap();
        assert_eq!(entry.get("count"), Some(&json!(2)));
    }

    #[test]
    fn key_ladder_falls_back() {
        let layer = SessionLayer::new();
        let adapter: flux_core::BoxedAdapter = Arc::new(CanonicalAdapter::from_sender(
            |_, _, _| async { Ok(Value::Null) },
        ));

        let both = flux_core::Context::new(
            Update::new(json!({ "chat_id": 7, "user_id": 9 })),
            Arc::clone(&adapter),
        );
        assert_eq!(layer.resolve_key(&both), "7:9");

        let chat_only =
            flux_core::Context::new(Update::new(json!({ "chat_id": 7 })), Arc::clone(&adapter));
        assert_eq!(layer.resolve_key(&chat_only), "7");

        let user_only =
            flux_core::Context::new(Update::new(json!({ "user_id": 9 })), Arc::clone(&adapter));
        assert_eq!(layer.resolve_key(&user_only), "9");

        let neither = flux_core::Context::new(Update::new(json!({})), Arc::clone(&adapter));
        assert_eq!(layer.resolve_key(&neither), "global");
    }

    #[test]
    fn custom_key_fn_wins() {
        let layer = SessionLayer::new().with_key_fn(|_ctx| Some("custom".to_owned()));
        let adapter: flux_core::BoxedAdapter = Arc::new(CanonicalAdapter::from_sender(
            |_, _, _| async { Ok(Value::Null) },
        ));
        let ctx = flux_core::Context::new(
            Update::new(json!({ "chat_id": 7, "user_id": 9 })),
            adapter,
        );
        assert_eq!(layer.resolve_key(&ctx), "custom");
    }

    #[tokio::test]
    async fn seeds_fresh_entries() {
        let store = Arc::new(MemoryStore::new());
        let mut bot = Bot::new(CanonicalAdapter::from_sender(|_, _, _| async {
            Ok(Value::Null)
        }));
        bot.use_middleware(
            SessionLayer::new()
                .with_store(Arc::clone(&store) as Arc<dyn SessionStore>)
                .with_seed(|| {
                    let mut data = SessionData::new();
                    data.insert("greeted", json!(false));
                    data
                })
                .middleware(),
        );

        bot.handle_update(keyed_update(1, 2, "hi")).await.unwrap();

        let entry = store.load("1:2").unwrap();
        assert_eq!(entry.get("greeted"), Some(&json!(false)));
    }
}
