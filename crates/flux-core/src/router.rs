//! Declarative routing operators built on the compose engine.
//!
//! Every operator returns a middleware: it tests its filters or triggers
//! against the context and either routes into its handler chain (with the
//! outer continuation as the chain's tail) or falls through to `next`.
//! Filter and trigger lists are scanned strictly in declaration order and
//! evaluation stops at the first success, so ties are impossible.

use std::sync::Arc;

use regex::Regex;
use tracing::trace;

use crate::adapter::ParsedCommand;
use crate::chain::{ArcMiddleware, BoxFuture, Chain, Middleware, Next};
use crate::context::Context;
use crate::error::DispatchResult;

// =============================================================================
// Filters
// =============================================================================

/// A type-erased context predicate.
pub type FilterFn = Arc<dyn Fn(&Context) -> bool + Send + Sync>;

/// Event-class filter used by [`on`].
#[derive(Clone)]
pub enum UpdateFilter {
    /// The update carries a message.
    Message,
    /// The update carries a callback action.
    CallbackQuery,
    /// The update carries an inline query.
    InlineQuery,
    /// The update carries non-empty message text.
    Text,
    /// Arbitrary predicate over the context.
    Custom(FilterFn),
}

impl UpdateFilter {
    /// Builds a custom predicate filter.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Context) -> bool + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    fn matches(&self, ctx: &Context) -> bool {
        match self {
            Self::Message => ctx.has_message(),
            Self::CallbackQuery => ctx.has_callback_query(),
            Self::InlineQuery => ctx.has_inline_query(),
            Self::Text => ctx.message_text().is_some_and(|text| !text.is_empty()),
            Self::Custom(f) => f(ctx),
        }
    }
}

impl std::fmt::Debug for UpdateFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Message => "Message",
            Self::CallbackQuery => "CallbackQuery",
            Self::InlineQuery => "InlineQuery",
            Self::Text => "Text",
            Self::Custom(_) => "Custom",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Triggers
// =============================================================================

/// A type-erased trigger function returning captured groups on a match.
pub type TriggerFn = Arc<dyn Fn(&str, &Context) -> Option<Vec<String>> + Send + Sync>;

/// Text trigger used by [`hears`] and [`action`].
#[derive(Clone)]
pub enum Trigger {
    /// Exact string equality.
    Exact(String),
    /// Pattern match producing captured groups.
    Pattern(Regex),
    /// Custom matcher over the value and context.
    Custom(TriggerFn),
}

impl Trigger {
    /// Builds a custom trigger.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&str, &Context) -> Option<Vec<String>> + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Applies this trigger to a value.
    ///
    /// On success index 0 holds the whole matched text and subsequent
    /// indices hold captured groups; groups that did not participate in the
    /// match are empty strings.
    fn apply(&self, value: &str, ctx: &Context) -> Option<Vec<String>> {
        match self {
            Self::Exact(expected) => (value == expected).then(|| vec![value.to_owned()]),
            Self::Pattern(pattern) => pattern.captures(value).map(|captures| {
                captures
                    .iter()
                    .map(|group| group.map(|m| m.as_str().to_owned()).unwrap_or_default())
                    .collect()
            }),
            Self::Custom(f) => f(value, ctx),
        }
    }
}

impl std::fmt::Debug for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(s) => f.debug_tuple("Exact").field(s).finish(),
            Self::Pattern(p) => f.debug_tuple("Pattern").field(&p.as_str()).finish(),
            Self::Custom(_) => f.write_str("Custom"),
        }
    }
}

impl From<&str> for Trigger {
    fn from(value: &str) -> Self {
        Self::Exact(value.to_owned())
    }
}

impl From<String> for Trigger {
    fn from(value: String) -> Self {
        Self::Exact(value)
    }
}

impl From<Regex> for Trigger {
    fn from(value: Regex) -> Self {
        Self::Pattern(value)
    }
}

// =============================================================================
// Argument conversions (single value or list)
// =============================================================================

/// Conversion into a filter list.
pub trait IntoFilters {
    /// Converts into the ordered filter list.
    fn into_filters(self) -> Vec<UpdateFilter>;
}

impl IntoFilters for UpdateFilter {
    fn into_filters(self) -> Vec<UpdateFilter> {
        vec![self]
    }
}

impl IntoFilters for Vec<UpdateFilter> {
    fn into_filters(self) -> Vec<UpdateFilter> {
        self
    }
}

impl<const N: usize> IntoFilters for [UpdateFilter; N] {
    fn into_filters(self) -> Vec<UpdateFilter> {
        self.into()
    }
}

/// Conversion into a trigger list.
pub trait IntoTriggers {
    /// Converts into the ordered trigger list.
    fn into_triggers(self) -> Vec<Trigger>;
}

impl IntoTriggers for Trigger {
    fn into_triggers(self) -> Vec<Trigger> {
        vec![self]
    }
}

impl IntoTriggers for &str {
    fn into_triggers(self) -> Vec<Trigger> {
        vec![self.into()]
    }
}

impl IntoTriggers for String {
    fn into_triggers(self) -> Vec<Trigger> {
        vec![self.into()]
    }
}

impl IntoTriggers for Regex {
    fn into_triggers(self) -> Vec<Trigger> {
        vec![self.into()]
    }
}

impl IntoTriggers for Vec<Trigger> {
    fn into_triggers(self) -> Vec<Trigger> {
        self
    }
}

impl<const N: usize> IntoTriggers for [Trigger; N] {
    fn into_triggers(self) -> Vec<Trigger> {
        self.into()
    }
}

/// Conversion into a command-name list.
pub trait IntoCommands {
    /// Converts into the command list.
    fn into_commands(self) -> Vec<String>;
}

impl IntoCommands for &str {
    fn into_commands(self) -> Vec<String> {
        vec![self.to_owned()]
    }
}

impl IntoCommands for String {
    fn into_commands(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoCommands for Vec<String> {
    fn into_commands(self) -> Vec<String> {
        self
    }
}

impl IntoCommands for Vec<&str> {
    fn into_commands(self) -> Vec<String> {
        self.into_iter().map(str::to_owned).collect()
    }
}

impl<const N: usize> IntoCommands for [&str; N] {
    fn into_commands(self) -> Vec<String> {
        self.into_iter().map(str::to_owned).collect()
    }
}

/// Conversion into a handler stack.
pub trait IntoStack {
    /// Converts into the ordered middleware stack.
    fn into_stack(self) -> Vec<ArcMiddleware>;
}

impl IntoStack for ArcMiddleware {
    fn into_stack(self) -> Vec<ArcMiddleware> {
        vec![self]
    }
}

impl IntoStack for Vec<ArcMiddleware> {
    fn into_stack(self) -> Vec<ArcMiddleware> {
        self
    }
}

impl<const N: usize> IntoStack for [ArcMiddleware; N] {
    fn into_stack(self) -> Vec<ArcMiddleware> {
        self.into()
    }
}

// =============================================================================
// Command token parsing
// =============================================================================

/// Parses a command token out of message text.
///
/// The text must begin with `/`; the token runs to the first whitespace, an
/// optional `@botname` suffix is stripped, and an empty name after stripping
/// is a non-match. The payload is the trimmed remainder after the token.
pub fn parse_command(text: &str) -> Option<ParsedCommand> {
    if !text.starts_with('/') {
        return None;
    }

    let token_end = text.find(char::is_whitespace);
    let token = match token_end {
        Some(end) => &text[..end],
        None => text,
    };

    let raw = &token[1..];
    if raw.is_empty() {
        return None;
    }

    let name = raw.split('@').next()?;
    if name.is_empty() {
        return None;
    }

    let payload = match token_end {
        Some(end) => text[end..].trim(),
        None => "",
    };

    Some(ParsedCommand {
        name: name.to_owned(),
        payload: payload.to_owned(),
    })
}

// =============================================================================
// Operators
// =============================================================================

struct On {
    filters: Vec<UpdateFilter>,
    chain: Chain,
}

impl Middleware for On {
    fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, DispatchResult<()>> {
        Box::pin(async move {
            if self.filters.iter().any(|filter| filter.matches(ctx)) {
                self.chain.run_with_tail(ctx, next).await
            } else {
                next.run(ctx).await
            }
        })
    }
}

/// Routes updates matching any of the filters into the handler chain.
pub fn on(filters: impl IntoFilters, handlers: impl IntoStack) -> ArcMiddleware {
    Arc::new(On {
        filters: filters.into_filters(),
        chain: Chain::new(handlers.into_stack()),
    })
}

struct Hears {
    triggers: Vec<Trigger>,
    chain: Chain,
}

impl Middleware for Hears {
    fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, DispatchResult<()>> {
        Box::pin(async move {
            let text = match ctx.message_text() {
                Some(text) if !text.is_empty() => text.to_owned(),
                _ => return next.run(ctx).await,
            };

            for trigger in &self.triggers {
                if let Some(captures) = trigger.apply(&text, ctx) {
                    trace!(text = %text, "text trigger matched");
                    ctx.set_trigger_match(captures);
                    return self.chain.run_with_tail(ctx, next).await;
                }
            }
            next.run(ctx).await
        })
    }
}

/// Routes message text matching any of the triggers into the handler chain.
///
/// On a match the captured groups are written to the context as
/// [`trigger_match`](Context::trigger_match) before the handlers run.
pub fn hears(triggers: impl IntoTriggers, handlers: impl IntoStack) -> ArcMiddleware {
    Arc::new(Hears {
        triggers: triggers.into_triggers(),
        chain: Chain::new(handlers.into_stack()),
    })
}

struct Action {
    triggers: Vec<Trigger>,
    chain: Chain,
}

impl Middleware for Action {
    fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, DispatchResult<()>> {
        Box::pin(async move {
            if !ctx.has_callback_query() {
                return next.run(ctx).await;
            }
            let data = match ctx.callback_data() {
                Some(data) => data.to_owned(),
                None => return next.run(ctx).await,
            };

            for trigger in &self.triggers {
                if let Some(captures) = trigger.apply(&data, ctx) {
                    trace!(data = %data, "callback trigger matched");
                    ctx.set_trigger_match(captures);
                    return self.chain.run_with_tail(ctx, next).await;
                }
            }
            next.run(ctx).await
        })
    }
}

/// Routes callback data matching any of the triggers into the handler chain.
pub fn action(triggers: impl IntoTriggers, handlers: impl IntoStack) -> ArcMiddleware {
    Arc::new(Action {
        triggers: triggers.into_triggers(),
        chain: Chain::new(handlers.into_stack()),
    })
}

struct Command {
    commands: Vec<String>,
    chain: Chain,
}

impl Middleware for Command {
    fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, DispatchResult<()>> {
        Box::pin(async move {
            let parsed = match ctx.message_text().and_then(parse_command) {
                Some(parsed) => parsed,
                None => return next.run(ctx).await,
            };
            if !self.commands.iter().any(|name| *name == parsed.name) {
                return next.run(ctx).await;
            }

            trace!(command = %parsed.name, "command matched");
            ctx.set_command(parsed.name, parsed.payload);
            self.chain.run_with_tail(ctx, next).await
        })
    }
}

/// Routes slash commands into the handler chain.
///
/// Matching is case-sensitive exact membership; a leading `/` in a
/// registered name is tolerated and stripped. On a match
/// [`command`](Context::command) and [`payload`](Context::payload) are set
/// before the handlers run.
pub fn command(commands: impl IntoCommands, handlers: impl IntoStack) -> ArcMiddleware {
    let commands = commands
        .into_commands()
        .into_iter()
        .map(|name| name.strip_prefix('/').map(str::to_owned).unwrap_or(name))
        .collect();
    Arc::new(Command {
        commands,
        chain: Chain::new(handlers.into_stack()),
    })
}

struct Composed {
    chain: Chain,
}

impl Middleware for Composed {
    fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, DispatchResult<()>> {
        Box::pin(async move { self.chain.run_with_tail(ctx, next).await })
    }
}

/// Groups several middleware into one.
pub fn compose(stack: impl IntoStack) -> ArcMiddleware {
    Arc::new(Composed {
        chain: Chain::new(stack.into_stack()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::handler_fn;
    use crate::test_support::{canonical_context, run_root};
    use parking_lot::Mutex;
    use serde_json::json;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, ArcMiddleware) {
        let hits: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&hits);
        let handler = handler_fn(move |ctx| {
            let sink = Arc::clone(&sink);
            Box::pin(async move {
                let matched = ctx
                    .trigger_match()
                    .map(|m| m.join(","))
                    .or_else(|| ctx.command().map(str::to_owned))
                    .unwrap_or_default();
                sink.lock().push(matched);
                Ok(())
            })
        });
        (hits, handler)
    }

    fn text_update(text: &str) -> serde_json::Value {
        json!({ "message": { "text": text } })
    }

    #[tokio::test]
    async fn hears_matches_exact_text_only() {
        let (hits, handler) = recorder();
        let mw = hears("hi", handler);

        let mut ctx = canonical_context(text_update("hi"));
        run_root(&mw, &mut ctx).await.unwrap();
        assert_eq!(*hits.lock(), vec!["hi"]);

        let mut ctx = canonical_context(text_update("high"));
        run_root(&mw, &mut ctx).await.unwrap();
        assert_eq!(hits.lock().len(), 1);
    }

    #[tokio::test]
    async fn hears_pattern_captures_groups() {
        let (hits, handler) = recorder();
        let mw = hears(Regex::new("^hello (.+)$").unwrap(), handler);

        let mut ctx = canonical_context(text_update("hello world"));
        run_root(&mw, &mut ctx).await.unwrap();

        assert_eq!(*hits.lock(), vec!["hello world,world"]);
    }

    #[tokio::test]
    async fn hears_first_trigger_in_order_wins() {
        let (hits, handler) = recorder();
        let mw = hears(
            vec![
                Trigger::from(Regex::new("^h(i)$").unwrap()),
                Trigger::from("hi"),
            ],
            handler,
        );

        let mut ctx = canonical_context(text_update("hi"));
        run_root(&mw, &mut ctx).await.unwrap();

        // the pattern came first, so the capture layout is the pattern's
        assert_eq!(*hits.lock(), vec!["hi,i"]);
    }

    #[tokio::test]
    async fn command_requires_leading_slash() {
        let (hits, handler) = recorder();
        let mw = command("start", handler);

        let mut ctx = canonical_context(text_update("/start hello"));
        run_root(&mw, &mut ctx).await.unwrap();
        assert_eq!(ctx.command(), Some("start"));
        assert_eq!(ctx.payload(), Some("hello"));
        assert_eq!(*hits.lock(), vec!["start"]);

        let mut ctx = canonical_context(text_update("start hello"));
        run_root(&mw, &mut ctx).await.unwrap();
        assert_eq!(ctx.command(), None);
        assert_eq!(hits.lock().len(), 1);
    }

    #[tokio::test]
    async fn command_strips_bot_suffix_and_registration_slash() {
        let (hits, handler) = recorder();
        let mw = command("/help", handler);

        let mut ctx = canonical_context(text_update("/help@somebot  topic  "));
        run_root(&mw, &mut ctx).await.unwrap();

        assert_eq!(ctx.command(), Some("help"));
        assert_eq!(ctx.payload(), Some("topic"));
        assert_eq!(hits.lock().len(), 1);
    }

    #[test]
    fn parse_command_rejects_empty_names() {
        assert!(parse_command("/").is_none());
        assert!(parse_command("/@bot").is_none());
        assert!(parse_command("plain").is_none());
        assert_eq!(parse_command("/ping").unwrap().name, "ping");
    }

    #[tokio::test]
    async fn action_matches_callback_data() {
        let (hits, handler) = recorder();
        let mw = action("confirm", handler);

        let mut ctx = canonical_context(json!({ "callback_query": { "data": "confirm" } }));
        run_root(&mw, &mut ctx).await.unwrap();
        assert_eq!(*hits.lock(), vec!["confirm"]);

        // message text does not trip an action trigger
        let mut ctx = canonical_context(text_update("confirm"));
        run_root(&mw, &mut ctx).await.unwrap();
        assert_eq!(hits.lock().len(), 1);
    }

    #[tokio::test]
    async fn on_falls_through_when_no_filter_matches() {
        let (hits, handler) = recorder();
        let mw = on(UpdateFilter::CallbackQuery, handler);

        let mut ctx = canonical_context(text_update("hi"));
        run_root(&mw, &mut ctx).await.unwrap();
        assert!(hits.lock().is_empty());
    }

    #[tokio::test]
    async fn on_custom_predicate() {
        let (hits, handler) = recorder();
        let mw = on(
            UpdateFilter::custom(|ctx| ctx.chat_id() == Some(42)),
            handler,
        );

        let mut ctx = canonical_context(json!({ "chat_id": 42, "message": { "text": "x" } }));
        run_root(&mw, &mut ctx).await.unwrap();
        assert_eq!(hits.lock().len(), 1);
    }
}
