//! Runtime error types.

use stagehand_core::ApiError;
use stagehand_framework::{RegistrationError, SessionError};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that stop a bot from coming up or from launching.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The session backend could not be reached.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// A component declaration was rejected.
    #[error("Registration error: {0}")]
    Registration(#[from] RegistrationError),

    /// The update source failed to start.
    #[error("Update source error: {0}")]
    Source(#[from] ApiError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
