//! Per-update context.
//!
//! One [`Context`] is created for every incoming update and shared, behind an
//! `Arc`, by every middleware, guard and handler that processes it. It holds:
//!
//! - the [`Update`] itself and a handle to the [`BotApi`];
//! - the **session slot**, filled by the session middleware before user code
//!   runs and written back after it finishes;
//! - a typed **extension map** where middlewares attach per-update state and
//!   capabilities (match captures, command arguments, the scene navigator,
//!   reply helpers).
//!
//! ```rust,ignore
//! async fn greet(ctx: Arc<Context>) -> HandlerResult {
//!     let visits: u32 = ctx.session_get("visits")?.unwrap_or(0);
//!     ctx.session_set("visits", visits + 1)?;
//!     Ok(())
//! }
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::api::BoxedApi;
use crate::error::ContextError;
use crate::update::{Update, User};

/// Session contents: a JSON object persisted between updates.
pub type SessionData = serde_json::Map<String, Value>;

/// The context handed to every middleware during processing of one update.
pub struct Context {
    this: Weak<Context>,
    update: Update,
    api: BoxedApi,
    session: Mutex<Option<SessionData>>,
    extensions: Mutex<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
}

impl Context {
    /// Creates the context for one update.
    pub fn new(update: Update, api: BoxedApi) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            update,
            api,
            session: Mutex::new(None),
            extensions: Mutex::new(HashMap::new()),
        })
    }

    /// Returns an owning handle to this context.
    ///
    /// Used by capabilities that must hand the context on to further
    /// middleware (scene entry, for instance).
    pub fn arc(&self) -> Result<Arc<Context>, ContextError> {
        self.this.upgrade().ok_or(ContextError::Detached)
    }

    // ─── Update accessors ─────────────────────────────────────────────────────

    /// Returns the update being processed.
    pub fn update(&self) -> &Update {
        &self.update
    }

    /// Returns the Bot API handle.
    pub fn api(&self) -> &BoxedApi {
        &self.api
    }

    /// Returns the chat this update belongs to.
    pub fn chat_id(&self) -> Option<i64> {
        self.update.chat_id()
    }

    /// Returns the user that caused this update.
    pub fn from(&self) -> Option<&User> {
        self.update.from()
    }

    /// Returns the message text, if any.
    pub fn text(&self) -> Option<&str> {
        self.update.text()
    }

    /// Returns the callback data, if any.
    pub fn callback_data(&self) -> Option<&str> {
        self.update.callback_data()
    }

    // ─── Extensions ───────────────────────────────────────────────────────────

    /// Stores a value in the extension map.
    ///
    /// Only one value per type can be stored; later calls overwrite.
    pub fn insert<T: Send + Sync + 'static>(&self, value: T) {
        self.extensions
            .lock()
            .insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a cloned value from the extension map.
    pub fn get<T: Clone + 'static>(&self) -> Option<T> {
        self.extensions
            .lock()
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
            .cloned()
    }

    /// Returns `true` if a value of type `T` is stored.
    pub fn contains<T: 'static>(&self) -> bool {
        self.extensions.lock().contains_key(&TypeId::of::<T>())
    }

    /// Removes and returns a value from the extension map.
    pub fn take<T: 'static>(&self) -> Option<T> {
        self.extensions
            .lock()
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast::<T>().ok())
            .map(|v| *v)
    }

    // ─── Session ──────────────────────────────────────────────────────────────

    /// Returns `true` if the session slot holds data.
    pub fn has_session(&self) -> bool {
        self.session.lock().is_some()
    }

    /// Returns a snapshot of the session.
    pub fn session(&self) -> Option<SessionData> {
        self.session.lock().clone()
    }

    /// Replaces the whole session slot, returning the previous contents.
    pub fn replace_session(&self, data: Option<SessionData>) -> Option<SessionData> {
        std::mem::replace(&mut *self.session.lock(), data)
    }

    /// Empties the session slot; the session middleware deletes it from the store.
    pub fn clear_session(&self) {
        self.session.lock().take();
    }

    /// Runs `f` against the session, creating an empty one if none exists.
    pub fn with_session<R>(&self, f: impl FnOnce(&mut SessionData) -> R) -> R {
        let mut slot = self.session.lock();
        f(slot.get_or_insert_with(SessionData::new))
    }

    /// Reads and deserializes one session value.
    pub fn session_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ContextError> {
        let slot = self.session.lock();
        let Some(value) = slot.as_ref().and_then(|s| s.get(key)) else {
            return Ok(None);
        };
        serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| ContextError::SessionValue {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    /// Serializes and stores one session value.
    pub fn session_set<T: Serialize>(&self, key: &str, value: T) -> Result<(), ContextError> {
        let value = serde_json::to_value(value).map_err(|e| ContextError::SessionValue {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.with_session(|s| s.insert(key.to_string(), value));
        Ok(())
    }

    /// Removes one session value.
    pub fn session_remove(&self, key: &str) -> Option<Value> {
        self.session.lock().as_mut().and_then(|s| s.remove(key))
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("update", &self.update)
            .field("has_session", &self.has_session())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::{BotApi, ReplyMarkup};
    use crate::error::{ApiError, ApiResult};
    use crate::update::Message;
    use async_trait::async_trait;

    pub(crate) struct NullApi;

    #[async_trait]
    impl BotApi for NullApi {
        async fn send_message(&self, _: i64, _: &str, _: Option<&ReplyMarkup>) -> ApiResult<i64> {
            Err(ApiError::NotConnected)
        }

        async fn edit_message_text(
            &self,
            _: i64,
            _: i64,
            _: &str,
            _: Option<&ReplyMarkup>,
        ) -> ApiResult<()> {
            Err(ApiError::NotConnected)
        }

        async fn answer_callback_query(&self, _: &str, _: Option<&str>) -> ApiResult<()> {
            Err(ApiError::NotConnected)
        }
    }

    pub(crate) fn text_context(text: &str) -> Arc<Context> {
        let from = User {
            id: 100,
            username: None,
            first_name: "Tester".into(),
        };
        Context::new(
            Update::message(1, Message::text(1, 500, Some(from), text)),
            Arc::new(NullApi),
        )
    }

    #[test]
    fn test_extensions_are_typed() {
        let ctx = text_context("hi");
        ctx.insert(5u32);
        ctx.insert("label".to_string());

        assert_eq!(ctx.get::<u32>(), Some(5));
        assert_eq!(ctx.get::<String>().as_deref(), Some("label"));
        assert!(ctx.contains::<u32>());
        assert_eq!(ctx.take::<u32>(), Some(5));
        assert!(!ctx.contains::<u32>());
    }

    #[test]
    fn test_session_values_round_trip() {
        let ctx = text_context("hi");
        assert!(!ctx.has_session());
        assert_eq!(ctx.session_get::<u32>("visits").unwrap(), None);

        ctx.session_set("visits", 3u32).unwrap();
        assert!(ctx.has_session());
        assert_eq!(ctx.session_get::<u32>("visits").unwrap(), Some(3));

        assert!(ctx.session_get::<Vec<String>>("visits").is_err());

        ctx.clear_session();
        assert!(!ctx.has_session());
    }

    #[test]
    fn test_arc_returns_same_context() {
        let ctx = text_context("hi");
        let again = ctx.arc().unwrap();
        assert!(Arc::ptr_eq(&ctx, &again));
    }
}
