//! Error types for registration and session storage.

use stagehand_core::{BoxError, SceneError};
use thiserror::Error;

/// Result type for the registrars.
pub type RegistrationResult<T> = Result<T, RegistrationError>;

/// Result type for session storage.
pub type SessionResult<T> = Result<T, SessionError>;

/// Configuration errors found while turning components into routes.
///
/// All of them are fatal: bring-up stops and no update is processed.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// Two scene components share an identifier.
    #[error("scene '{0}' is declared more than once")]
    DuplicateScene(String),

    /// A component declares a handler kind its registrar cannot bind.
    #[error("{component} declares a {kind} handler '{method}', which is not supported there")]
    UnsupportedHandler {
        /// Component name (scene id or update component name).
        component: String,
        /// Handler kind, e.g. `command` or `enter`.
        kind: &'static str,
        /// Method the handler was declared on.
        method: String,
    },

    /// Guard entries name methods the component never declared.
    #[error("{component} has guards for undeclared methods: {}", methods.join(", "))]
    OrphanGuards {
        /// Component name.
        component: String,
        /// The unknown method names.
        methods: Vec<String>,
    },

    /// The scene-registered hook failed.
    #[error("on_scene_registered hook failed for scene '{scene}': {source}")]
    Hook {
        /// The scene being registered.
        scene: String,
        /// The hook's error.
        #[source]
        source: BoxError,
    },

    /// The stage rejected a scene.
    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Errors raised by session stores.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The backend is unreachable.
    #[error("lost connection to session store at {address}: {reason}")]
    LostConnection {
        /// `host:port` of the backend.
        address: String,
        /// Underlying error message.
        reason: String,
    },

    /// A stored value is not a JSON object.
    #[error("session '{key}' holds invalid data: {source}")]
    Codec {
        /// The full backend key.
        key: String,
        /// The JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A backend command failed after the connection was established.
    #[error("session backend error: {0}")]
    Backend(String),
}
