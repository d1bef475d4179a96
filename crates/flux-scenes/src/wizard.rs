//! Wizards: scenes backed by an ordered list of step handlers.
//!
//! Each dispatch runs exactly the handler at the clamped current step; the
//! handler drives progress through [`Context::wizard`] (`next`, `back`,
//! `select_step`). Step indices persist in the session, namespaced by
//! wizard name, so several wizards can coexist per conversation.

use std::sync::Arc;

use tracing::trace;

use flux_core::{ArcMiddleware, Middleware, middleware_fn};

use crate::scene::Scene;

/// Builder for step-list scenes.
pub struct Wizard;

impl Wizard {
    /// Builds a wizard scene from an ordered step list.
    ///
    /// The scene dispatches the handler at the persisted step index (clamped
    /// to the current step count, so stale indices from a shrunk list
    /// re-clamp). An empty step list falls through to the outer chain.
    /// Requires the session and stage middleware, in that order.
    pub fn new(name: impl Into<String>, steps: Vec<ArcMiddleware>) -> Scene {
        let name = name.into();
        let scene_name = name.clone();
        let steps: Arc<[ArcMiddleware]> = steps.into();

        let body = middleware_fn(move |ctx, next| {
            let name = name.clone();
            let steps = Arc::clone(&steps);
            Box::pin(async move {
                if steps.is_empty() {
                    return next.run(ctx).await;
                }
                let step = ctx.begin_wizard_turn(&name, steps.len())?;
                trace!(wizard = %name, step, "running wizard step");
                let handler = Arc::clone(&steps[step]);
                handler.handle(ctx, next).await
            })
        });

        Scene::new(scene_name, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionLayer;
    use crate::stage::Stage;
    use flux_core::{Bot, CanonicalAdapter, Update, handler_fn};
    use parking_lot::Mutex;
    use serde_json::{Value, json};

    fn update(text: &str) -> Update {
        Update::new(json!({
            "chat_id": 1,
            "user_id": 2,
            "message": { "text": text }
        }))
    }

    fn step(label: &'static str, hits: &Arc<Mutex<Vec<String>>>, advance: bool) -> ArcMiddleware {
        let hits = Arc::clone(hits);
        handler_fn(move |ctx| {
            let hits = Arc::clone(&hits);
            Box::pin(async move {
                hits.lock().push(label.to_owned());
                if advance {
                    ctx.wizard()?.next();
                }
                Ok(())
            })
        })
    }

    fn wizard_bot(hits: &Arc<Mutex<Vec<String>>>) -> Bot {
        let mut bot = Bot::new(CanonicalAdapter::from_sender(|_, _, _| async {
            Ok(Value::Null)
        }));

        let wizard = Wizard::new(
            "signup",
            vec![step("ask-name", hits, true), step("ask-age", hits, false)],
        );
        let mut stage = Stage::new();
        stage.register(wizard);

        bot.use_middleware(SessionLayer::new().middleware());
        bot.command("signup", Stage::enter("signup"));
        bot.use_middleware(stage.middleware());
        bot
    }

    #[tokio::test]
    async fn steps_advance_and_clamp_at_the_end() {
        let hits: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let bot = wizard_bot(&hits);

        bot.handle_update(update("/signup")).await.unwrap();
        bot.handle_update(update("Ada")).await.unwrap();
        bot.handle_update(update("36")).await.unwrap();

        // the second step never advances, so the index stays clamped there
        assert_eq!(*hits.lock(), vec!["ask-name", "ask-age", "ask-age"]);
    }

    #[tokio::test]
    async fn back_and_select_step_clamp() {
        let hits: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let mut bot = Bot::new(CanonicalAdapter::from_sender(|_, _, _| async {
            Ok(Value::Null)
        }));

        let probe = Arc::clone(&hits);
        let wizard = Wizard::new(
            "probe",
            vec![handler_fn(move |ctx| {
                let probe = Arc::clone(&probe);
                Box::pin(async move {
                    let mut cursor = ctx.wizard()?;
                    cursor.back();
                    probe.lock().push(format!("back={}", cursor.step()));
                    cursor.select_step(5);
                    probe.lock().push(format!("select={}", cursor.step()));
                    Ok(())
                })
            })],
        );
        let mut stage = Stage::new();
        stage.register(wizard);

        bot.use_middleware(SessionLayer::new().middleware());
        bot.command("go", Stage::enter("probe"));
        bot.use_middleware(stage.middleware());

        bot.handle_update(update("/go")).await.unwrap();

        // one step only: back clamps at 0, select_step(5) clamps to 0
        assert_eq!(*hits.lock(), vec!["back=0", "select=0"]);
    }

    #[tokio::test]
    async fn empty_wizard_falls_through() {
        let hits: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let mut bot = Bot::new(CanonicalAdapter::from_sender(|_, _, _| async {
            Ok(Value::Null)
        }));

        let mut stage = Stage::new();
        stage.register(Wizard::new("empty", Vec::new()));

        bot.use_middleware(SessionLayer::new().middleware());
        bot.command("go", Stage::enter("empty"));
        bot.use_middleware(stage.middleware());

        let tail = Arc::clone(&hits);
        bot.use_middleware(handler_fn(move |_ctx| {
            let tail = Arc::clone(&tail);
            Box::pin(async move {
                tail.lock().push("tail".to_owned());
                Ok(())
            })
        }));

        bot.handle_update(update("/go")).await.unwrap();
        assert_eq!(*hits.lock(), vec!["tail"]);
    }
}
