//! # Stagehand Runtime
//!
//! Turns a configuration file and a set of components into a running bot:
//!
//! - [`config`]: figment-based loading (`stagehand.toml`, `STAGEHAND_*`)
//! - [`logging`]: `tracing-subscriber` setup driven by [`LoggingConfig`]
//! - [`Bootstrap`]: bring-up in a fixed order, yielding a [`ReadyBot`]
//!
//! ```rust,ignore
//! use stagehand_runtime::{Bootstrap, config::load_config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bot = Bootstrap::new(load_config()?, api).bring_up().await?;
//!     bot.launch(source).await?;
//!     Ok(())
//! }
//! ```

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod logging;

pub use bootstrap::{Bootstrap, LaunchSummary, ReadyBot};
pub use config::{
    BotConfig, ConfigError, ConfigLoader, ConfigResult, DispatchConfig, LoggingConfig,
    StagehandConfig,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};

pub use tracing;
pub use tracing_subscriber;

/// Logging macros for handlers.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
