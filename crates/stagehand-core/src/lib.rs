//! # Stagehand Core
//!
//! The dispatch engine of the Stagehand bot routing framework.
//!
//! This crate provides:
//! - [`Update`] and [`Context`], the per-update state every handler sees
//! - the `(ctx, next)` [`Middleware`] model and [`Composer`] routers
//! - [`GuardChain`], the pre-handler check executor
//! - [`Scene`] and [`Stage`] for multi-step conversations
//! - [`Dispatcher`], the per-update error boundary (also a `tower::Service`)
//!
//! It knows nothing about sessions storage or declarative components; those
//! live in `stagehand-framework`.

pub mod api;
pub mod composer;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod guard;
pub mod middleware;
pub mod scene;
pub mod source;
pub mod trigger;
pub mod update;

pub use api::{BotApi, BoxedApi, InlineButton, ReplyMarkup};
pub use composer::{Composer, Listener, UpdateFilter};
pub use context::{Context, SessionData};
pub use dispatcher::Dispatcher;
pub use error::{ApiError, ApiResult, BoxError, ContextError, HandlerResult, SceneError};
pub use guard::{
    BoxedGuard, Guard, GuardChain, GuardCursor, GuardFn, GuardPolicy, guard_chain, guard_fn,
    guard_if,
};
pub use middleware::{
    BoxedMiddleware, Chain, HandlerFn, Middleware, MiddlewareFn, Next, compose, handler_fn,
    middleware_fn,
};
pub use scene::{SCENE_SESSION_KEY, Scene, SceneNavigator, Stage};
pub use source::{ChannelSource, LaunchOptions, UpdateSource};
pub use trigger::{CommandArgs, Commands, Trigger, TriggerMatch, Triggers};
pub use update::{CallbackQuery, Chat, Media, Message, MessageField, Update, UpdateKind, User};

pub use async_trait::async_trait;
