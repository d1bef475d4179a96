//! Stage: the scene registry and its dispatch middleware.
//!
//! The stage reads the active scene name from the session on every update
//! and, when the name is registered, fully delegates to that scene's chain.
//! An unregistered or absent scene name falls through to the rest of the
//! outer pipeline. Requires the session middleware earlier in the chain.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use flux_core::{
    ArcMiddleware, BoxFuture, Context, DispatchResult, Middleware, Next, middleware_fn,
};

use crate::scene::Scene;

/// Scene registry + dispatch middleware.
///
/// Populated at setup time via [`register`](Stage::register) and never
/// mutated during dispatch: the stage moves into the bot as a regular
/// middleware once assembly is done.
#[derive(Default)]
pub struct Stage {
    scenes: HashMap<String, Scene>,
}

impl Stage {
    /// Creates an empty stage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a scene under its name.
    ///
    /// A later registration with the same name replaces the earlier one.
    pub fn register(&mut self, scene: Scene) -> &mut Self {
        debug!(scene = scene.name(), "scene registered");
        self.scenes.insert(scene.name().to_owned(), scene);
        self
    }

    /// Registers a scene (builder form).
    pub fn with_scene(mut self, scene: Scene) -> Self {
        self.register(scene);
        self
    }

    /// Returns the number of registered scenes.
    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    /// Wraps this stage as a registrable middleware.
    pub fn middleware(self) -> ArcMiddleware {
        Arc::new(self)
    }

    /// Middleware that activates a scene, then continues the chain.
    ///
    /// The name is not validated against the registry: entering an
    /// unregistered scene means the stage finds nothing to delegate to and
    /// falls through on subsequent updates.
    pub fn enter(name: impl Into<String>) -> ArcMiddleware {
        let name = name.into();
        middleware_fn(move |ctx, next| {
            let name = name.clone();
            Box::pin(async move {
                ctx.scene()?.enter(name);
                next.run(ctx).await
            })
        })
    }

    /// Middleware that deactivates the current scene, then continues.
    pub fn leave() -> ArcMiddleware {
        middleware_fn(|ctx, next| {
            Box::pin(async move {
                ctx.scene()?.leave();
                next.run(ctx).await
            })
        })
    }
}

impl Middleware for Stage {
    fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, DispatchResult<()>> {
        Box::pin(async move {
            let current = ctx.scene()?.current().map(str::to_owned);
            match current.and_then(|name| self.scenes.get(&name)) {
                Some(scene) => {
                    trace!(scene = scene.name(), "delegating to active scene");
                    scene.chain().run_with_tail(ctx, next).await
                }
                None => next.run(ctx).await,
            }
        })
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("scene_count", &self.scenes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionLayer;
    use flux_core::{Bot, CanonicalAdapter, DispatchError, Update, handler_fn};
    use parking_lot::Mutex;
    use serde_json::{Value, json};

    fn update(text: &str) -> Update {
        Update::new(json!({
            "chat_id": 1,
            "user_id": 2,
            "message": { "text": text }
        }))
    }

    fn new_bot() -> Bot {
        Bot::new(CanonicalAdapter::from_sender(|_, _, _| async {
            Ok(Value::Null)
        }))
    }

    fn recording_scene(name: &str, hits: &Arc<Mutex<Vec<String>>>) -> Scene {
        let hits = Arc::clone(hits);
        let name_owned = name.to_owned();
        Scene::new(
            name,
            handler_fn(move |_ctx| {
                let hits = Arc::clone(&hits);
                let name = name_owned.clone();
                Box::pin(async move {
                    hits.lock().push(name);
                    Ok(())
                })
            }),
        )
    }

    #[tokio::test]
    async fn entered_scene_handles_subsequent_updates_until_leave() {
        let hits: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let mut bot = new_bot();

        let mut stage = Stage::new();
        stage.register(recording_scene("echo", &hits));

        bot.use_middleware(SessionLayer::new().middleware());
        bot.command("enter", Stage::enter("echo"));
        bot.command("exit", Stage::leave());
        bot.use_middleware(stage.middleware());

        let outside = Arc::clone(&hits);
        bot.use_middleware(handler_fn(move |_ctx| {
            let outside = Arc::clone(&outside);
            Box::pin(async move {
                outside.lock().push("outside".to_owned());
                Ok(())
            })
        }));

        bot.handle_update(update("hello")).await.unwrap();
        bot.handle_update(update("/enter")).await.unwrap();
        bot.handle_update(update("anything")).await.unwrap();
        bot.handle_update(update("/exit")).await.unwrap();
        bot.handle_update(update("bye")).await.unwrap();

        // transitions continue down the chain, so the /enter update is
        // already delegated to the scene; only scene-less updates reach the
        // tail handler
        assert_eq!(
            *hits.lock(),
            vec!["outside", "echo", "echo", "outside", "outside"]
        );
    }

    #[tokio::test]
    async fn unregistered_scene_falls_through() {
        let hits: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let mut bot = new_bot();

        bot.use_middleware(SessionLayer::new().middleware());
        bot.command("enter", Stage::enter("ghost"));
        bot.use_middleware(Stage::new().middleware());

        let outside = Arc::clone(&hits);
        bot.use_middleware(handler_fn(move |_ctx| {
            let outside = Arc::clone(&outside);
            Box::pin(async move {
                outside.lock().push("outside".to_owned());
                Ok(())
            })
        }));

        bot.handle_update(update("/enter")).await.unwrap();
        bot.handle_update(update("still here")).await.unwrap();

        assert_eq!(*hits.lock(), vec!["outside", "outside"]);
    }

    #[tokio::test]
    async fn stage_without_session_is_fatal() {
        let mut bot = new_bot();
        bot.use_middleware(Stage::new().middleware());

        let err = bot.handle_update(update("hi")).await.unwrap_err();
        assert!(matches!(err, DispatchError::SessionRequired { .. }));
    }
}
