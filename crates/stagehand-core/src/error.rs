//! Error types for the Stagehand core.

use thiserror::Error;

pub use tower::BoxError;

/// The result every middleware, guard and handler resolves to.
///
/// The success value carries no information; an `Err` aborts processing of
/// the current update and surfaces at the dispatcher's per-update boundary.
pub type HandlerResult = Result<(), BoxError>;

/// Result type for outbound Bot API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors returned by a [`BotApi`](crate::api::BotApi) implementation.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The transport is not connected.
    #[error("bot is not connected")]
    NotConnected,

    /// The platform rejected the call.
    #[error("api error ({code}): {description}")]
    Rejected {
        /// Platform error code.
        code: i32,
        /// Platform error description.
        description: String,
    },

    /// The request could not be delivered.
    #[error("transport error: {0}")]
    Transport(String),

    /// The update has no chat to address the call to.
    #[error("update has no chat to reply to")]
    NoChat,
}

/// Errors raised while reading or mutating a [`Context`](crate::context::Context).
#[derive(Debug, Clone, Error)]
pub enum ContextError {
    /// A capability was requested that no middleware attached to this context.
    #[error("context capability '{0}' is not available; is its middleware installed?")]
    MissingCapability(&'static str),

    /// A session value could not be converted to or from JSON.
    #[error("session value '{key}' has an unexpected shape: {reason}")]
    SessionValue {
        /// The session key that failed to convert.
        key: String,
        /// The serde error message.
        reason: String,
    },

    /// The context was used after its update finished processing.
    #[error("context is no longer attached to an update")]
    Detached,
}

/// Errors raised by the scene stage.
#[derive(Debug, Clone, Error)]
pub enum SceneError {
    /// Two scenes were registered under the same identifier.
    #[error("scene '{0}' is already registered")]
    Duplicate(String),

    /// A handler asked to enter a scene that was never registered.
    #[error("scene '{0}' is not registered")]
    UnknownScene(String),

    /// Scene state was written while no scene is entered.
    #[error("no scene is entered")]
    NotEntered,

    /// The scene bookkeeping in the session could not be read or written.
    #[error(transparent)]
    Context(#[from] ContextError),
}
