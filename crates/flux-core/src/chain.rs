//! Middleware composition engine.
//!
//! An ordered list of middleware compiles into a single [`Chain`] dispatch
//! following the onion model: code before a middleware's `next.run(ctx)`
//! executes outer-to-inner, code after it executes inner-to-outer. A
//! middleware that never invokes its continuation short-circuits the rest of
//! the chain, which is supported behavior; invoking the continuation twice is
//! a protocol violation surfaced as
//! [`DispatchError::NextCalledMultipleTimes`].
//!
//! # Example
//!
//! ```rust,ignore
//! use flux_core::{Chain, middleware_fn};
//!
//! let chain = Chain::new(vec![
//!     middleware_fn(|ctx, next| {
//!         Box::pin(async move {
//!             // runs on the way in
//!             let result = next.run(ctx).await;
//!             // runs on the way out
//!             result
//!         })
//!     }),
//! ]);
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::context::Context;
use crate::error::{DispatchError, DispatchResult};

/// Boxed future alias used across the middleware system.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A single middleware link.
///
/// A middleware receives exclusive access to the per-update [`Context`] and a
/// [`Next`] continuation for the remainder of the chain. Results and errors
/// propagate unchanged to the dispatch caller; the engine adds no
/// transformation of its own.
pub trait Middleware: Send + Sync {
    /// Processes one update, optionally continuing into the rest of the chain.
    fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, DispatchResult<()>>;
}

/// A shared, type-erased middleware.
pub type ArcMiddleware = Arc<dyn Middleware>;

struct MiddlewareFn<F>(F);

impl<F> Middleware for MiddlewareFn<F>
where
    F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, DispatchResult<()>> + Send + Sync,
{
    fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, DispatchResult<()>> {
        (self.0)(ctx, next)
    }
}

/// Wraps a `(ctx, next)` closure as a middleware.
pub fn middleware_fn<F>(f: F) -> ArcMiddleware
where
    F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, DispatchResult<()>>
        + Send
        + Sync
        + 'static,
{
    Arc::new(MiddlewareFn(f))
}

struct HandlerFn<F>(F);

impl<F> Middleware for HandlerFn<F>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, DispatchResult<()>> + Send + Sync,
{
    fn handle<'a>(&'a self, ctx: &'a mut Context, _next: Next<'a>) -> BoxFuture<'a, DispatchResult<()>> {
        (self.0)(ctx)
    }
}

/// Wraps a terminal handler closure as a middleware.
///
/// The handler never continues into the rest of the chain, so everything
/// registered after it is short-circuited once it runs.
pub fn handler_fn<F>(f: F) -> ArcMiddleware
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, DispatchResult<()>> + Send + Sync + 'static,
{
    Arc::new(HandlerFn(f))
}

/// An ordered middleware list compiled into a single dispatch.
///
/// Cloning is cheap; the stack is shared.
#[derive(Clone)]
pub struct Chain {
    stack: Arc<[ArcMiddleware]>,
}

impl Chain {
    /// Builds a chain from an ordered middleware list.
    pub fn new(stack: Vec<ArcMiddleware>) -> Self {
        Self {
            stack: stack.into(),
        }
    }

    /// Returns the number of middleware in this chain.
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Returns `true` if this chain has no middleware.
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Dispatches one update through the chain.
    ///
    /// The final middleware's continuation resolves to `Ok(())`.
    pub async fn run(&self, ctx: &mut Context) -> DispatchResult<()> {
        let guard = AtomicI64::new(-1);
        let entry = Next {
            stack: &self.stack,
            index: 0,
            guard: &guard,
            tail: None,
        };
        entry.run(ctx).await
    }

    /// Dispatches one update through the chain, continuing into `tail` when
    /// the chain is exhausted.
    ///
    /// This is how nested chains (router handler groups, scenes) fall through
    /// into the outer pipeline.
    pub async fn run_with_tail(&self, ctx: &mut Context, tail: Next<'_>) -> DispatchResult<()> {
        let guard = AtomicI64::new(-1);
        let entry = Next {
            stack: &self.stack,
            index: 0,
            guard: &guard,
            tail: Some(&tail),
        };
        entry.run(ctx).await
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain").field("len", &self.len()).finish()
    }
}

/// Continuation into the remainder of a chain.
///
/// Each link may run its continuation at most once per dispatch; a second
/// invocation fails with [`DispatchError::NextCalledMultipleTimes`]. The
/// guard is a per-dispatch watermark of the deepest link entered so far.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    stack: &'a [ArcMiddleware],
    index: usize,
    guard: &'a AtomicI64,
    tail: Option<&'a Next<'a>>,
}

impl Next<'_> {
    /// Continues into the next middleware (or the tail, or resolves).
    pub fn run<'b>(&'b self, ctx: &'b mut Context) -> BoxFuture<'b, DispatchResult<()>> {
        Box::pin(async move {
            let slot = self.index as i64;
            if slot <= self.guard.load(Ordering::SeqCst) {
                return Err(DispatchError::NextCalledMultipleTimes);
            }
            self.guard.store(slot, Ordering::SeqCst);

            match self.stack.get(self.index) {
                Some(middleware) => {
                    let next = Next {
                        stack: self.stack,
                        index: self.index + 1,
                        guard: self.guard,
                        tail: self.tail,
                    };
                    middleware.handle(ctx, next).await
                }
                None => match self.tail {
                    Some(tail) => tail.run(ctx).await,
                    None => Ok(()),
                },
            }
        })
    }
}
