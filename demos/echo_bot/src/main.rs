//! Echo Bot Demo
//!
//! A scripted walkthrough of the flux pipeline: session + stage + a greeting
//! wizard, a text trigger, and a slash command, fed by the mock adapter's
//! scripted polling source.
//!
//! The script plays three updates (a greeting, `/start` entering the wizard,
//! and the wizard's answer); replies are logged by the mock adapter.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package echo-bot
//! ```

use std::sync::Arc;

use anyhow::Result;
use serde_json::json;
use tracing::info;

use flux::prelude::*;
use flux::runtime::config::FluxConfig;
use flux_adapter_mock::{MockAdapter, scripted_source};

/// Two-step wizard: ask for a name, then greet with it.
fn greeting_wizard() -> Scene {
    Wizard::new(
        "greet",
        vec![
            handler_fn(|ctx| {
                Box::pin(async move {
                    ctx.reply("What's your name?").await?;
                    ctx.wizard()?.next();
                    Ok(())
                })
            }),
            handler_fn(|ctx| {
                Box::pin(async move {
                    let name = ctx.message_text().unwrap_or("stranger").to_owned();
                    ctx.reply(&format!("Nice to meet you, {name}!")).await?;
                    ctx.scene()?.leave();
                    Ok(())
                })
            }),
        ],
    )
}

fn scripted_updates() -> Vec<serde_json::Value> {
    vec![
        json!({
            "update_id": 1,
            "chat_id": 1,
            "message": { "text": "hi", "sender": { "user_id": 7 } }
        }),
        json!({
            "update_id": 2,
            "chat_id": 1,
            "message": { "text": "/start", "sender": { "user_id": 7 } }
        }),
        json!({
            "update_id": 3,
            "chat_id": 1,
            "message": { "text": "Ada", "sender": { "user_id": 7 } }
        }),
    ]
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut bot = Bot::new(MockAdapter::new());

    let mut stage = Stage::new();
    stage.register(greeting_wizard());

    bot.use_middleware(SessionLayer::new().middleware());
    bot.command("start", Stage::enter("greet"));
    bot.use_middleware(stage.middleware());

    bot.hears(
        "hi",
        handler_fn(|ctx| {
            Box::pin(async move {
                ctx.reply("hello!").await?;
                Ok(())
            })
        }),
    );

    bot.help(handler_fn(|ctx| {
        Box::pin(async move {
            ctx.reply("say `hi`, or `/start` to meet the wizard").await?;
            Ok(())
        })
    }));

    let config = FluxConfig::default();
    let runtime = FluxRuntime::new(&config, Arc::new(bot), scripted_source(scripted_updates()));

    info!("replaying scripted updates; press Ctrl+C to exit");
    runtime.run().await?;
    Ok(())
}
