//! Configuration for the Stagehand runtime.
//!
//! Settings are loaded with figment from defaults, `stagehand.toml` /
//! `stagehand.yaml`, and `STAGEHAND_*` environment variables, then checked
//! by [`validate_config`].

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    BotConfig, DispatchConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig,
    SpanEventConfig, StagehandConfig,
};
pub use validation::validate_config;
