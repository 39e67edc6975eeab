//! The `(ctx, next)` middleware model.
//!
//! Every stage of the pipeline is a [`Middleware`]: it receives the shared
//! [`Context`] and a [`Next`] continuation. Calling `next.run(ctx)` hands the
//! update to the rest of the pipeline; returning without calling it ends
//! processing for this update.
//!
//! ```text
//! session ──▶ augmenter ──▶ update listeners ──▶ stage ──▶ (end)
//!    │            │               │                 │
//!    └─ next ─────┴─ next ────────┴─ next ──────────┘
//! ```
//!
//! Closures are adapted with [`middleware_fn`] (receives `next`) and
//! [`handler_fn`] (terminal, never continues).

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::context::Context;
use crate::error::HandlerResult;

/// One stage of the update-processing pipeline.
pub trait Middleware: Send + Sync + 'static {
    /// Processes `ctx`, optionally continuing with `next`.
    fn call(&self, ctx: Arc<Context>, next: Next) -> BoxFuture<'static, HandlerResult>;
}

/// Shared, type-erased middleware.
pub type BoxedMiddleware = Arc<dyn Middleware>;

// ============================================================================
// Next
// ============================================================================

/// The continuation handed to a middleware.
///
/// A `Next` walks a fixed chain of middleware; once the chain is exhausted it
/// resumes the outer continuation it was composed with, or finishes when
/// there is none.
#[derive(Clone)]
pub struct Next {
    chain: Arc<[BoxedMiddleware]>,
    index: usize,
    outer: Option<Arc<Next>>,
}

impl Next {
    /// A continuation that does nothing.
    pub fn noop() -> Self {
        Self {
            chain: Arc::from(Vec::new()),
            index: 0,
            outer: None,
        }
    }

    fn new(chain: Arc<[BoxedMiddleware]>, outer: Option<Next>) -> Self {
        Self {
            chain,
            index: 0,
            outer: outer.map(Arc::new),
        }
    }

    /// Runs the rest of the pipeline.
    pub fn run(self, ctx: Arc<Context>) -> BoxFuture<'static, HandlerResult> {
        match self.chain.get(self.index).cloned() {
            Some(mw) => {
                let next = Next {
                    chain: Arc::clone(&self.chain),
                    index: self.index + 1,
                    outer: self.outer.clone(),
                };
                mw.call(ctx, next)
            }
            None => match self.outer {
                Some(outer) => Next::clone(&outer).run(ctx),
                None => futures::future::ready(Ok(())).boxed(),
            },
        }
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.chain.len().saturating_sub(self.index))
            .field("has_outer", &self.outer.is_some())
            .finish()
    }
}

// ============================================================================
// Composition
// ============================================================================

/// A fixed chain of middleware acting as a single middleware.
///
/// When the chain runs out, the caller's `next` resumes.
#[derive(Clone)]
pub struct Chain {
    stack: Arc<[BoxedMiddleware]>,
}

impl Chain {
    /// Creates a chain from middleware in execution order.
    pub fn new(stack: impl IntoIterator<Item = BoxedMiddleware>) -> Self {
        Self {
            stack: stack.into_iter().collect(),
        }
    }

    /// Returns the number of middleware in the chain.
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Returns `true` if the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

impl Middleware for Chain {
    fn call(&self, ctx: Arc<Context>, next: Next) -> BoxFuture<'static, HandlerResult> {
        Next::new(Arc::clone(&self.stack), Some(next)).run(ctx)
    }
}

/// Composes middleware into one, boxed.
pub fn compose(stack: impl IntoIterator<Item = BoxedMiddleware>) -> BoxedMiddleware {
    Arc::new(Chain::new(stack))
}

// ============================================================================
// Closure adapters
// ============================================================================

/// A middleware built from a closure taking `(ctx, next)`.
#[derive(Clone)]
pub struct MiddlewareFn<F>(F);

impl<F, Fut> Middleware for MiddlewareFn<F>
where
    F: Fn(Arc<Context>, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, ctx: Arc<Context>, next: Next) -> BoxFuture<'static, HandlerResult> {
        (self.0)(ctx, next).boxed()
    }
}

/// Adapts a `(ctx, next)` closure into a boxed middleware.
pub fn middleware_fn<F, Fut>(f: F) -> BoxedMiddleware
where
    F: Fn(Arc<Context>, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(MiddlewareFn(f))
}

/// A terminal middleware built from a closure taking only `ctx`.
///
/// The continuation is dropped, so nothing after a handler runs for this
/// update.
#[derive(Clone)]
pub struct HandlerFn<F>(F);

impl<F, Fut> Middleware for HandlerFn<F>
where
    F: Fn(Arc<Context>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, ctx: Arc<Context>, _next: Next) -> BoxFuture<'static, HandlerResult> {
        (self.0)(ctx).boxed()
    }
}

/// Adapts a `ctx` closure into a boxed terminal middleware.
pub fn handler_fn<F, Fut>(f: F) -> BoxedMiddleware
where
    F: Fn(Arc<Context>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(HandlerFn(f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::text_context;
    use parking_lot::Mutex;

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> BoxedMiddleware {
        let log = Arc::clone(log);
        middleware_fn(move |ctx, next: Next| {
            log.lock().push(name);
            next.run(ctx)
        })
    }

    #[tokio::test]
    async fn test_chain_runs_in_order_then_resumes_outer() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let inner = compose([recorder(&log, "a"), recorder(&log, "b")]);
        let outer = Chain::new([inner, recorder(&log, "after")]);

        outer.call(text_context("x"), Next::noop()).await.unwrap();

        assert_eq!(*log.lock(), vec!["a", "b", "after"]);
    }

    #[tokio::test]
    async fn test_handler_stops_the_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler_log = Arc::clone(&log);
        let chain = Chain::new([
            handler_fn(move |_ctx| {
                let log = Arc::clone(&handler_log);
                async move {
                    log.lock().push("handler");
                    Ok(())
                }
            }),
            recorder(&log, "unreachable"),
        ]);

        chain.call(text_context("x"), Next::noop()).await.unwrap();

        assert_eq!(*log.lock(), vec!["handler"]);
    }

    #[tokio::test]
    async fn test_error_propagates() {
        let chain = Chain::new([handler_fn(|_ctx| async { Err("boom".into()) })]);
        let err = chain.call(text_context("x"), Next::noop()).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }
}
