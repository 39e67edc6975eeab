//! Handler instances and their declarations.
//!
//! A component constructor returns a [`HandlerInstance`]: the declared
//! handlers of one component, in declaration order, together with its global
//! middlewares and its [`GuardMap`]. Registrars consume an instance exactly
//! once.
//!
//! Handlers are usually methods of a shared state struct. [`bind`] and
//! [`bind_middleware`] capture the instance and the method at declaration
//! time, so no lookup by name happens at dispatch time.
//!
//! ```rust,ignore
//! struct Checkout { prices: PriceTable }
//!
//! impl Checkout {
//!     async fn welcome(self: Arc<Self>, ctx: Arc<Context>) -> HandlerResult { ... }
//!     async fn buy(self: Arc<Self>, ctx: Arc<Context>) -> HandlerResult { ... }
//! }
//!
//! fn checkout() -> HandlerInstance {
//!     let this = Arc::new(Checkout { prices: PriceTable::load() });
//!     HandlerInstance::new("checkout")
//!         .on_enter("welcome", bind(&this, Checkout::welcome))
//!         .on_action("buy", Regex::new(r"^buy:(\d+)$").unwrap(), bind(&this, Checkout::buy))
//!         .guards("buy", [logged_in(), has_cart()])
//! }
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use stagehand_core::{
    BoxedGuard, BoxedMiddleware, Commands, Context, HandlerResult, MessageField, Next, Triggers,
    handler_fn, middleware_fn,
};

// ============================================================================
// Descriptors
// ============================================================================

/// What a declared handler reacts to.
#[derive(Debug, Clone)]
pub enum HandlerKind {
    /// Runs when the scene is entered.
    Enter,
    /// Runs when the scene is left.
    Leave,
    /// Runs when callback data matches.
    Action(Triggers),
    /// Runs when message text matches.
    Hears(Triggers),
    /// Runs when the message carries every listed field.
    Event(Vec<MessageField>),
    /// Runs when the message invokes one of the commands.
    Command(Commands),
}

impl HandlerKind {
    /// Short name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Enter => "enter",
            Self::Leave => "leave",
            Self::Action(_) => "action",
            Self::Hears(_) => "hears",
            Self::Event(_) => "event",
            Self::Command(_) => "command",
        }
    }
}

/// One declared handler.
#[derive(Clone)]
pub struct HandlerDescriptor {
    /// The method name guards are keyed by.
    pub method: String,
    /// What the handler reacts to.
    pub kind: HandlerKind,
    /// The handler itself.
    pub handler: BoxedMiddleware,
}

impl std::fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("method", &self.method)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// One declared global middleware.
#[derive(Clone)]
pub struct MiddlewareDescriptor {
    /// The name guards are keyed by.
    pub name: String,
    /// The middleware itself.
    pub middleware: BoxedMiddleware,
}

impl std::fmt::Debug for MiddlewareDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareDescriptor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// GuardMap
// ============================================================================

/// Guards per method name. A missing entry means no guards.
#[derive(Clone, Default)]
pub struct GuardMap {
    entries: HashMap<String, Vec<BoxedGuard>>,
}

impl GuardMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends guards to `method`'s list.
    pub fn extend(&mut self, method: impl Into<String>, guards: impl IntoIterator<Item = BoxedGuard>) {
        self.entries.entry(method.into()).or_default().extend(guards);
    }

    /// Returns the guards for `method`, in declared order.
    pub fn get(&self, method: &str) -> Vec<BoxedGuard> {
        self.entries.get(method).cloned().unwrap_or_default()
    }

    /// Returns `true` if `method` has an entry.
    pub fn contains(&self, method: &str) -> bool {
        self.entries.contains_key(method)
    }

    /// Returns the keyed method names.
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Returns the number of keyed methods.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no method has guards.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for GuardMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k, v.len())))
            .finish()
    }
}

// ============================================================================
// HandlerInstance
// ============================================================================

/// The declarations of one component.
#[derive(Debug, Clone)]
pub struct HandlerInstance {
    name: String,
    handlers: Vec<HandlerDescriptor>,
    middlewares: Vec<MiddlewareDescriptor>,
    guards: GuardMap,
}

impl HandlerInstance {
    /// Creates an instance with no declarations.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handlers: Vec::new(),
            middlewares: Vec::new(),
            guards: GuardMap::new(),
        }
    }

    fn declare(mut self, method: &str, kind: HandlerKind, handler: BoxedMiddleware) -> Self {
        self.handlers.push(HandlerDescriptor {
            method: method.to_string(),
            kind,
            handler,
        });
        self
    }

    /// Declares a scene entry handler.
    pub fn on_enter(self, method: &str, handler: BoxedMiddleware) -> Self {
        self.declare(method, HandlerKind::Enter, handler)
    }

    /// Declares a scene exit handler.
    pub fn on_leave(self, method: &str, handler: BoxedMiddleware) -> Self {
        self.declare(method, HandlerKind::Leave, handler)
    }

    /// Declares an inline-action handler.
    pub fn on_action(
        self,
        method: &str,
        trigger: impl Into<Triggers>,
        handler: BoxedMiddleware,
    ) -> Self {
        self.declare(method, HandlerKind::Action(trigger.into()), handler)
    }

    /// Declares a text listener.
    pub fn on_hears(
        self,
        method: &str,
        triggers: impl Into<Triggers>,
        handler: BoxedMiddleware,
    ) -> Self {
        self.declare(method, HandlerKind::Hears(triggers.into()), handler)
    }

    /// Declares a message-shape listener.
    pub fn on_event(
        self,
        method: &str,
        filters: impl IntoIterator<Item = MessageField>,
        handler: BoxedMiddleware,
    ) -> Self {
        let filters = filters.into_iter().collect();
        self.declare(method, HandlerKind::Event(filters), handler)
    }

    /// Declares a slash-command listener.
    pub fn on_command(
        self,
        method: &str,
        commands: impl Into<Commands>,
        handler: BoxedMiddleware,
    ) -> Self {
        self.declare(method, HandlerKind::Command(commands.into()), handler)
    }

    /// Declares a global middleware.
    pub fn middleware(mut self, name: &str, middleware: BoxedMiddleware) -> Self {
        self.middlewares.push(MiddlewareDescriptor {
            name: name.to_string(),
            middleware,
        });
        self
    }

    /// Appends one guard to `method`.
    pub fn guard(mut self, method: &str, guard: BoxedGuard) -> Self {
        self.guards.extend(method, [guard]);
        self
    }

    /// Appends guards to `method`, in order.
    pub fn guards(mut self, method: &str, guards: impl IntoIterator<Item = BoxedGuard>) -> Self {
        self.guards.extend(method, guards);
        self
    }

    /// Returns the component name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared handlers in declaration order.
    pub fn handlers(&self) -> &[HandlerDescriptor] {
        &self.handlers
    }

    /// Returns the declared global middlewares in declaration order.
    pub fn middlewares(&self) -> &[MiddlewareDescriptor] {
        &self.middlewares
    }

    /// Returns the guard map.
    pub fn guard_map(&self) -> &GuardMap {
        &self.guards
    }

    /// Guard keys that name neither a handler nor a middleware, sorted.
    pub fn orphan_guards(&self) -> Vec<String> {
        let mut orphans: Vec<String> = self
            .guards
            .methods()
            .filter(|m| {
                !self.handlers.iter().any(|h| h.method == *m)
                    && !self.middlewares.iter().any(|mw| mw.name == *m)
            })
            .map(str::to_string)
            .collect();
        orphans.sort();
        orphans
    }

    /// Splits the instance into its declarations.
    pub fn into_parts(self) -> (Vec<HandlerDescriptor>, Vec<MiddlewareDescriptor>, GuardMap) {
        (self.handlers, self.middlewares, self.guards)
    }
}

// ============================================================================
// Binding helpers
// ============================================================================

/// Binds a terminal handler method to a shared instance.
pub fn bind<T, F, Fut>(this: &Arc<T>, method: F) -> BoxedMiddleware
where
    T: Send + Sync + 'static,
    F: Fn(Arc<T>, Arc<Context>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    let this = Arc::clone(this);
    handler_fn(move |ctx| method(Arc::clone(&this), ctx))
}

/// Binds a `(ctx, next)` middleware method to a shared instance.
pub fn bind_middleware<T, F, Fut>(this: &Arc<T>, method: F) -> BoxedMiddleware
where
    T: Send + Sync + 'static,
    F: Fn(Arc<T>, Arc<Context>, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    let this = Arc::clone(this);
    middleware_fn(move |ctx, next| method(Arc::clone(&this), ctx, next))
}
