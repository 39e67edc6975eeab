//! # Stagehand
//!
//! Declarative routing for chat bots: components declare handlers, guards
//! and scenes; registrars wire them onto one bot-wide pipeline.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐    ┌────────────┐    ┌─────────────────────────────────────────┐
//! │ UpdateSource │───▶│ Dispatcher │───▶│ session ▶ augmenter ▶ navigator         │
//! └──────────────┘    └────────────┘    │   ▶ update components (guarded)         │
//!                                       │   ▶ stage ▶ current scene (guarded)     │
//!                                       └─────────────────────────────────────────┘
//! ```
//!
//! - **Components**: a [`SceneComponent`](prelude::SceneComponent) builds one
//!   scene; an [`UpdateComponent`](prelude::UpdateComponent) contributes
//!   bot-wide listeners and middleware
//! - **Guards**: ordered checks in front of each handler, walked by a
//!   [`GuardCursor`](prelude::GuardCursor)
//! - **Sessions**: per chat and user, in Redis or in memory
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stagehand::prelude::*;
//!
//! #[scene("welcome")]
//! fn welcome() -> HandlerInstance {
//!     HandlerInstance::new("welcome").on_enter(
//!         "greet",
//!         handler_fn(|ctx| async move {
//!             ctx.reply("Hello!", None).await?;
//!             Ok(())
//!         }),
//!     )
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bot = Bootstrap::new(load_config()?, api).bring_up().await?;
//!     bot.launch(source).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: `stagehand.toml` support
//! - `yaml-config`: `stagehand.yaml` support
//! - `json-log`: JSON log lines

pub use stagehand_core as core;
pub use stagehand_framework as framework;
pub use stagehand_runtime as runtime;

/// Commonly used types for building bots.
///
/// ```rust,ignore
/// use stagehand::prelude::*;
/// ```
pub mod prelude {
    // Bring-up
    pub use stagehand_runtime::config::load_config;
    pub use stagehand_runtime::{Bootstrap, ReadyBot, RuntimeError, StagehandConfig};

    // Components
    pub use stagehand_framework::{
        ComponentRegistry, HandlerInstance, ReplyExt, SceneComponent, UpdateComponent, bind,
        bind_middleware,
    };
    pub use stagehand_macros::{scene, update_component};

    // Routing primitives
    pub use stagehand_core::{
        BotApi, BoxError, BoxedGuard, BoxedMiddleware, ChannelSource, Context, GuardCursor,
        GuardPolicy, HandlerResult, InlineButton, MessageField, Next, ReplyMarkup, Trigger,
        Update, UpdateSource, async_trait, guard_fn, guard_if, handler_fn, middleware_fn,
    };
}
