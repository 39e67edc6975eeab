//! Router fragments.
//!
//! A [`Composer`] collects middleware and filtered listeners in install order
//! and exposes them as a single middleware. The bot-wide router and the body
//! of every scene are composers.
//!
//! # Matching
//!
//! A listener whose filter matches runs its chain with the outer `next` as
//! continuation; one that does not match passes straight to `next`. So a
//! matching terminal handler ends dispatch (first match wins), while a
//! matching middleware that calls `next` lets later listeners see the update.
//!
//! ```rust,ignore
//! let mut router = Composer::new();
//! router
//!     .use_middleware(logger)
//!     .command("start", [start_handler])
//!     .hears(Regex::new(r"^buy (\d+)$")?, [guard_chain, buy_handler])
//!     .on([MessageField::Photo], [photo_handler]);
//! let pipeline = router.middleware();
//! ```

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::trace;

use crate::context::Context;
use crate::error::HandlerResult;
use crate::middleware::{BoxedMiddleware, Chain, Middleware, Next, compose};
use crate::trigger::{Commands, Triggers};
use crate::update::MessageField;

// ============================================================================
// Listener
// ============================================================================

/// The filter half of a [`Listener`].
#[derive(Debug, Clone)]
pub enum UpdateFilter {
    /// Message text matches one of the triggers.
    Hears(Triggers),
    /// Callback data matches one of the triggers.
    Action(Triggers),
    /// Message text invokes one of the commands.
    Command(Commands),
    /// Message carries every listed field.
    Message(Vec<MessageField>),
}

impl UpdateFilter {
    /// Tests the update, attaching match details to the context on success.
    pub fn check(&self, ctx: &Context) -> bool {
        match self {
            Self::Hears(triggers) => match ctx.text().and_then(|t| triggers.matches(t)) {
                Some(m) => {
                    ctx.insert(m);
                    true
                }
                None => false,
            },
            Self::Action(triggers) => match ctx.callback_data().and_then(|d| triggers.matches(d)) {
                Some(m) => {
                    ctx.insert(m);
                    true
                }
                None => false,
            },
            Self::Command(commands) => match ctx.text().and_then(|t| commands.matches(t)) {
                Some(args) => {
                    ctx.insert(args);
                    true
                }
                None => false,
            },
            Self::Message(fields) => ctx
                .update()
                .as_message()
                .is_some_and(|m| m.has_all(fields)),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Hears(_) => "hears",
            Self::Action(_) => "action",
            Self::Command(_) => "command",
            Self::Message(_) => "on",
        }
    }
}

/// A chain that only runs when its filter matches the update.
pub struct Listener {
    filter: UpdateFilter,
    chain: Chain,
}

impl Listener {
    /// Creates a listener.
    pub fn new(filter: UpdateFilter, chain: impl IntoIterator<Item = BoxedMiddleware>) -> Self {
        Self {
            filter,
            chain: Chain::new(chain),
        }
    }
}

impl Middleware for Listener {
    fn call(&self, ctx: Arc<Context>, next: Next) -> BoxFuture<'static, HandlerResult> {
        if self.filter.check(&ctx) {
            trace!(
                listener = self.filter.kind(),
                chain_len = self.chain.len(),
                "Listener matched"
            );
            self.chain.call(ctx, next)
        } else {
            next.run(ctx)
        }
    }
}

// ============================================================================
// Composer
// ============================================================================

/// An ordered collection of middleware and listeners.
#[derive(Default, Clone)]
pub struct Composer {
    stack: Vec<BoxedMiddleware>,
}

impl Composer {
    /// Creates an empty composer.
    pub fn new() -> Self {
        Self { stack: Vec::new() }
    }

    /// Installs middleware that sees every update.
    pub fn use_middleware(&mut self, middleware: BoxedMiddleware) -> &mut Self {
        self.stack.push(middleware);
        self
    }

    /// Installs a chain that runs when the message text matches `triggers`.
    pub fn hears(
        &mut self,
        triggers: impl Into<Triggers>,
        chain: impl IntoIterator<Item = BoxedMiddleware>,
    ) -> &mut Self {
        self.listen(UpdateFilter::Hears(triggers.into()), chain)
    }

    /// Installs a chain that runs when the message carries every field in `filters`.
    pub fn on(
        &mut self,
        filters: impl IntoIterator<Item = MessageField>,
        chain: impl IntoIterator<Item = BoxedMiddleware>,
    ) -> &mut Self {
        self.listen(UpdateFilter::Message(filters.into_iter().collect()), chain)
    }

    /// Installs a chain that runs when the message invokes one of `commands`.
    pub fn command(
        &mut self,
        commands: impl Into<Commands>,
        chain: impl IntoIterator<Item = BoxedMiddleware>,
    ) -> &mut Self {
        self.listen(UpdateFilter::Command(commands.into()), chain)
    }

    /// Installs a chain that runs when callback data matches `triggers`.
    pub fn action(
        &mut self,
        triggers: impl Into<Triggers>,
        chain: impl IntoIterator<Item = BoxedMiddleware>,
    ) -> &mut Self {
        self.listen(UpdateFilter::Action(triggers.into()), chain)
    }

    /// Installs a filtered chain.
    pub fn listen(
        &mut self,
        filter: UpdateFilter,
        chain: impl IntoIterator<Item = BoxedMiddleware>,
    ) -> &mut Self {
        self.stack.push(Arc::new(Listener::new(filter, chain)));
        self
    }

    /// Returns the number of installed entries.
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Returns `true` if nothing is installed.
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Freezes the installed entries into one middleware.
    pub fn middleware(&self) -> BoxedMiddleware {
        compose(self.stack.iter().cloned())
    }
}

impl std::fmt::Debug for Composer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Composer")
            .field("len", &self.stack.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::{NullApi, text_context};
    use crate::middleware::{handler_fn, middleware_fn};
    use crate::trigger::{CommandArgs, TriggerMatch};
    use crate::update::{CallbackQuery, Update, User};
    use parking_lot::Mutex;
    use regex::Regex;

    type Log = Arc<Mutex<Vec<String>>>;

    fn record(log: &Log, name: &str) -> BoxedMiddleware {
        let log = Arc::clone(log);
        let name = name.to_string();
        handler_fn(move |_ctx| {
            let log = Arc::clone(&log);
            let name = name.clone();
            async move {
                log.lock().push(name);
                Ok(())
            }
        })
    }

    async fn run(composer: &Composer, ctx: Arc<Context>) {
        composer
            .middleware()
            .call(ctx, Next::noop())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_first_matching_handler_wins() {
        let log: Log = Arc::default();
        let mut composer = Composer::new();
        composer
            .hears("hello", [record(&log, "first")])
            .hears("hello", [record(&log, "second")]);

        run(&composer, text_context("hello")).await;

        assert_eq!(*log.lock(), vec!["first"]);
    }

    #[tokio::test]
    async fn test_middleware_sees_every_update() {
        let log: Log = Arc::default();
        let seen = Arc::clone(&log);
        let mut composer = Composer::new();
        composer
            .use_middleware(middleware_fn(move |ctx, next: Next| {
                seen.lock().push("mw".to_string());
                next.run(ctx)
            }))
            .hears("nope", [record(&log, "hears")])
            .command("start", [record(&log, "start")]);

        run(&composer, text_context("/start now")).await;

        assert_eq!(*log.lock(), vec!["mw", "start"]);
    }

    #[tokio::test]
    async fn test_hears_stores_captures_for_handler() {
        let captured: Arc<Mutex<Option<TriggerMatch>>> = Arc::default();
        let slot = Arc::clone(&captured);
        let mut composer = Composer::new();
        composer.hears(
            Regex::new(r"^buy (\d+)$").unwrap(),
            [handler_fn(move |ctx| {
                let slot = Arc::clone(&slot);
                async move {
                    *slot.lock() = ctx.get::<TriggerMatch>();
                    Ok(())
                }
            })],
        );

        run(&composer, text_context("buy 3")).await;

        let m = captured.lock().clone().unwrap();
        assert_eq!(m.captures, vec![Some("3".to_string())]);
    }

    #[tokio::test]
    async fn test_command_stores_arguments() {
        let captured: Arc<Mutex<Option<CommandArgs>>> = Arc::default();
        let slot = Arc::clone(&captured);
        let mut composer = Composer::new();
        composer.command(
            "/greet",
            [handler_fn(move |ctx| {
                let slot = Arc::clone(&slot);
                async move {
                    *slot.lock() = ctx.get::<CommandArgs>();
                    Ok(())
                }
            })],
        );

        run(&composer, text_context("/greet Ann")).await;

        assert_eq!(captured.lock().as_ref().unwrap().payload, "Ann");
    }

    #[tokio::test]
    async fn test_action_matches_callback_data_only() {
        let log: Log = Arc::default();
        let mut composer = Composer::new();
        composer
            .action("buy", [record(&log, "action")])
            .on([MessageField::Text], [record(&log, "text")]);

        let query = Update::callback_query(
            2,
            CallbackQuery {
                id: "q1".into(),
                from: User {
                    id: 1,
                    username: None,
                    first_name: "A".into(),
                },
                message: None,
                data: Some("buy".into()),
            },
        );
        run(&composer, Context::new(query, Arc::new(NullApi))).await;
        run(&composer, text_context("buy")).await;

        assert_eq!(*log.lock(), vec!["action", "text"]);
    }
}
