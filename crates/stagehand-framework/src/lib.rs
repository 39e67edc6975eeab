//! # Stagehand Framework
//!
//! Declarative components on top of `stagehand-core`.
//!
//! This layer provides:
//! - [`HandlerInstance`] declarations with per-method guard lists
//! - [`SceneComponent`] / [`UpdateComponent`] and the link-time
//!   [`ComponentRegistry`]
//! - [`SceneRegistrar`] and [`UpdateRegistrar`], which turn components into
//!   routes behind guard chains
//! - the [`ContextAugmenter`] and its [`ReplyExt`] capabilities
//! - the [`session`] adapter (Redis or in-memory)

pub mod augment;
pub mod component;
pub mod error;
pub mod instance;
pub mod registrar;
pub mod session;

#[cfg(test)]
mod testing;

pub use augment::{ContextAugmenter, LAST_REPLY_KEY, ReplyExt, ReplyHelper, Responder};
pub use component::{
    Component, ComponentRegistry, Constructor, SCENE_COMPONENTS, SceneComponent,
    UPDATE_COMPONENTS, UpdateComponent,
};
pub use error::{RegistrationError, RegistrationResult, SessionError, SessionResult};
pub use instance::{
    GuardMap, HandlerDescriptor, HandlerInstance, HandlerKind, MiddlewareDescriptor, bind,
    bind_middleware,
};
pub use registrar::{SceneHook, SceneRegistrar, UpdateRegistrar};
pub use session::{
    BoxedSessionStore, MemorySessionStore, SessionBackendKind, SessionConfig, SessionMiddleware,
    SessionStore,
};

#[doc(hidden)]
pub use linkme;
