//! Guard chains.
//!
//! A guard is a pre-check that runs before a handler. Every handler is
//! registered behind a [`GuardChain`], the single middleware that executes its
//! ordered guard list and then continues to the handler.
//!
//! # Policies
//!
//! [`GuardPolicy::Cursor`] (the default) is a chain of responsibility. Each
//! guard receives a [`GuardCursor`] and calls [`advance`](GuardCursor::advance)
//! to hand control to the next guard, or past the last guard, to the handler.
//! A guard that returns without advancing rejects the update: later guards
//! and the handler do not run. The executor never invokes a guard on its own
//! initiative, so each guard runs at most once per update.
//!
//! [`GuardPolicy::RunAll`] runs every guard exactly once, in order, whether
//! or not it advances (its cursor is inert), then runs the handler once.
//! Guards under this policy can only reject by returning an error.
//!
//! ```text
//! Cursor:  g0 ─advance─▶ g1 ─advance─▶ g2 ─advance─▶ handler
//! RunAll:  g0 ──▶ g1 ──▶ g2 ──▶ handler      (advance is a no-op)
//! ```
//!
//! Under both policies an `Err` from a guard aborts the update and reaches
//! the dispatcher's error boundary unchanged.

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::context::Context;
use crate::error::HandlerResult;
use crate::middleware::{BoxedMiddleware, Middleware, Next};

/// A pre-handler check.
pub trait Guard: Send + Sync + 'static {
    /// Inspects `ctx`; calls `cursor.advance()` to let processing continue.
    fn check(&self, ctx: Arc<Context>, cursor: GuardCursor) -> BoxFuture<'static, HandlerResult>;
}

/// Shared, type-erased guard.
pub type BoxedGuard = Arc<dyn Guard>;

/// A guard built from a closure taking `(ctx, cursor)`.
#[derive(Clone)]
pub struct GuardFn<F>(F);

impl<F, Fut> Guard for GuardFn<F>
where
    F: Fn(Arc<Context>, GuardCursor) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn check(&self, ctx: Arc<Context>, cursor: GuardCursor) -> BoxFuture<'static, HandlerResult> {
        (self.0)(ctx, cursor).boxed()
    }
}

/// Adapts a `(ctx, cursor)` closure into a boxed guard.
pub fn guard_fn<F, Fut>(f: F) -> BoxedGuard
where
    F: Fn(Arc<Context>, GuardCursor) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(GuardFn(f))
}

/// Adapts a synchronous predicate into a guard that advances when it holds.
pub fn guard_if<F>(predicate: F) -> BoxedGuard
where
    F: Fn(&Context) -> bool + Send + Sync + 'static,
{
    guard_fn(move |ctx, cursor: GuardCursor| {
        let pass = predicate(ctx.as_ref());
        async move {
            if pass {
                cursor.advance().await
            } else {
                Ok(())
            }
        }
    })
}

// ============================================================================
// GuardPolicy
// ============================================================================

/// How a [`GuardChain`] walks its guards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GuardPolicy {
    /// Chain of responsibility; a guard must advance for processing to continue.
    #[default]
    Cursor,
    /// Every guard runs once in order, then the handler runs.
    RunAll,
}

// ============================================================================
// GuardCursor
// ============================================================================

enum CursorState {
    Live {
        guards: Arc<[BoxedGuard]>,
        index: usize,
        next: Next,
    },
    Inert,
}

/// The position of a guard inside its chain.
///
/// [`advance`](Self::advance) consumes the cursor, so a guard can hand
/// control on at most once.
pub struct GuardCursor {
    ctx: Arc<Context>,
    state: CursorState,
}

impl GuardCursor {
    fn live(ctx: Arc<Context>, guards: Arc<[BoxedGuard]>, index: usize, next: Next) -> Self {
        Self {
            ctx,
            state: CursorState::Live {
                guards,
                index,
                next,
            },
        }
    }

    fn inert(ctx: Arc<Context>) -> Self {
        Self {
            ctx,
            state: CursorState::Inert,
        }
    }

    /// Returns `true` if advancing hands control to a guard or the handler.
    pub fn is_live(&self) -> bool {
        matches!(self.state, CursorState::Live { .. })
    }

    /// Runs the next guard, or the handler once every guard has advanced.
    pub fn advance(self) -> BoxFuture<'static, HandlerResult> {
        match self.state {
            CursorState::Live {
                guards,
                index,
                next,
            } => match guards.get(index).cloned() {
                Some(guard) => {
                    trace!(guard_index = index, "Entering guard");
                    let cursor = GuardCursor::live(
                        Arc::clone(&self.ctx),
                        Arc::clone(&guards),
                        index + 1,
                        next,
                    );
                    guard.check(self.ctx, cursor)
                }
                None => next.run(self.ctx),
            },
            CursorState::Inert => futures::future::ready(Ok(())).boxed(),
        }
    }
}

impl std::fmt::Debug for GuardCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardCursor")
            .field("live", &self.is_live())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// GuardChain
// ============================================================================

/// The middleware that executes one handler's guards.
#[derive(Clone)]
pub struct GuardChain {
    guards: Arc<[BoxedGuard]>,
    policy: GuardPolicy,
}

impl GuardChain {
    /// Creates a guard chain.
    pub fn new(guards: impl IntoIterator<Item = BoxedGuard>, policy: GuardPolicy) -> Self {
        Self {
            guards: guards.into_iter().collect(),
            policy,
        }
    }

    /// Returns the number of guards.
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    /// Returns `true` if the chain has no guards.
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    /// Returns the policy the chain runs under.
    pub fn policy(&self) -> GuardPolicy {
        self.policy
    }
}

impl Middleware for GuardChain {
    fn call(&self, ctx: Arc<Context>, next: Next) -> BoxFuture<'static, HandlerResult> {
        match self.policy {
            GuardPolicy::Cursor => {
                GuardCursor::live(ctx, Arc::clone(&self.guards), 0, next).advance()
            }
            GuardPolicy::RunAll => {
                let guards = Arc::clone(&self.guards);
                async move {
                    for (index, guard) in guards.iter().enumerate() {
                        trace!(guard_index = index, "Running guard");
                        guard
                            .check(Arc::clone(&ctx), GuardCursor::inert(Arc::clone(&ctx)))
                            .await?;
                    }
                    next.run(ctx).await
                }
                .boxed()
            }
        }
    }
}

/// Builds the guard-chain middleware for one handler.
pub fn guard_chain(
    guards: impl IntoIterator<Item = BoxedGuard>,
    policy: GuardPolicy,
) -> BoxedMiddleware {
    Arc::new(GuardChain::new(guards, policy))
}
