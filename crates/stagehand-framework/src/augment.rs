//! Context augmentation: reply helpers available to every handler.
//!
//! The [`ContextAugmenter`] is installed ahead of all user middleware. For
//! every update it attaches a [`Responder`] bound to the process-wide
//! [`ReplyHelper`], then continues. Handlers reach it through [`ReplyExt`]:
//!
//! ```rust,ignore
//! async fn menu(ctx: Arc<Context>) -> HandlerResult {
//!     ctx.reply("Pick one", Some(&keyboard)).await?;
//!     Ok(())
//! }
//!
//! async fn picked(ctx: Arc<Context>) -> HandlerResult {
//!     // Rewrites the menu message in place.
//!     ctx.edit_reply("Done!", None).await?;
//!     Ok(())
//! }
//! ```

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use futures::future::BoxFuture;
use stagehand_core::{
    ApiError, BoxError, Context, ContextError, HandlerResult, Middleware, Next, ReplyMarkup,
};
use tracing::{debug, trace, warn};

/// Session key holding the id of the last message sent with `reply`.
pub const LAST_REPLY_KEY: &str = "__last_reply";

// ============================================================================
// ReplyHelper
// ============================================================================

/// Implements reply and edit-reply on behalf of a context.
///
/// Stateless; one process-wide instance is shared by every update.
#[derive(Debug, Default)]
pub struct ReplyHelper {
    _private: (),
}

static SHARED: OnceLock<Arc<ReplyHelper>> = OnceLock::new();

impl ReplyHelper {
    /// Returns the process-wide helper, creating it on first use.
    pub fn shared() -> Arc<ReplyHelper> {
        Arc::clone(SHARED.get_or_init(|| Arc::new(ReplyHelper::default())))
    }

    /// Sends `text` to the update's chat and remembers the message id.
    pub async fn reply(
        &self,
        ctx: &Context,
        text: &str,
        markup: Option<&ReplyMarkup>,
    ) -> Result<i64, BoxError> {
        let chat_id = ctx.chat_id().ok_or(ApiError::NoChat)?;
        let message_id = ctx.api().send_message(chat_id, text, markup).await?;
        ctx.session_set(LAST_REPLY_KEY, message_id)?;
        trace!(chat_id, message_id, "Reply sent");
        Ok(message_id)
    }

    /// Edits the message this conversation last showed, or replies.
    ///
    /// Targets, in order: the message carrying the pressed inline keyboard
    /// (the callback is acknowledged), then the last `reply` recorded in the
    /// session. If there is no target or the edit is rejected, a new message
    /// is sent instead. A failed acknowledgement is only logged.
    pub async fn edit_reply(
        &self,
        ctx: &Context,
        text: &str,
        markup: Option<&ReplyMarkup>,
    ) -> Result<i64, BoxError> {
        let api = ctx.api();

        let pressed = ctx
            .update()
            .as_callback_query()
            .and_then(|q| q.message.as_ref().map(|m| (q, m)));
        if let Some((query, message)) = pressed {
            let (chat_id, message_id) = (message.chat.id, message.message_id);
            let edited = api
                .edit_message_text(chat_id, message_id, text, markup)
                .await;
            if let Err(e) = api.answer_callback_query(&query.id, None).await {
                warn!(error = %e, query = %query.id, "Callback acknowledgement failed");
            }
            match edited {
                Ok(()) => return Ok(message_id),
                Err(e) => debug!(error = %e, "Edit of callback message failed, replying"),
            }
            return self.reply(ctx, text, markup).await;
        }

        let last = ctx.session_get::<i64>(LAST_REPLY_KEY)?;
        if let (Some(chat_id), Some(message_id)) = (ctx.chat_id(), last) {
            match api
                .edit_message_text(chat_id, message_id, text, markup)
                .await
            {
                Ok(()) => return Ok(message_id),
                Err(e) => debug!(error = %e, "Edit of last reply failed, replying"),
            }
        }

        self.reply(ctx, text, markup).await
    }
}

// ============================================================================
// Responder & augmenter
// ============================================================================

/// The reply capability attached to an augmented context.
#[derive(Debug, Clone)]
pub struct Responder {
    helper: Arc<ReplyHelper>,
}

impl Responder {
    /// Returns the helper this responder is bound to.
    pub fn helper(&self) -> &Arc<ReplyHelper> {
        &self.helper
    }
}

/// Middleware attaching a [`Responder`] to every context.
#[derive(Debug, Clone)]
pub struct ContextAugmenter {
    helper: Arc<ReplyHelper>,
}

impl ContextAugmenter {
    /// Creates an augmenter bound to `helper`.
    pub fn new(helper: Arc<ReplyHelper>) -> Self {
        Self { helper }
    }
}

impl Middleware for ContextAugmenter {
    fn call(&self, ctx: Arc<Context>, next: Next) -> BoxFuture<'static, HandlerResult> {
        ctx.insert(Responder {
            helper: Arc::clone(&self.helper),
        });
        next.run(ctx)
    }
}

// ============================================================================
// ReplyExt
// ============================================================================

/// Reply capabilities on an augmented [`Context`].
#[async_trait]
pub trait ReplyExt {
    /// Sends a message to the update's chat; returns its id.
    async fn reply(&self, text: &str, markup: Option<&ReplyMarkup>) -> Result<i64, BoxError>;

    /// Edits the last shown message, falling back to [`reply`](Self::reply).
    async fn edit_reply(&self, text: &str, markup: Option<&ReplyMarkup>)
    -> Result<i64, BoxError>;
}

fn responder(ctx: &Context) -> Result<Responder, ContextError> {
    ctx.get::<Responder>()
        .ok_or(ContextError::MissingCapability("reply"))
}

#[async_trait]
impl ReplyExt for Context {
    async fn reply(&self, text: &str, markup: Option<&ReplyMarkup>) -> Result<i64, BoxError> {
        let responder = responder(self)?;
        responder.helper.reply(self, text, markup).await
    }

    async fn edit_reply(
        &self,
        text: &str,
        markup: Option<&ReplyMarkup>,
    ) -> Result<i64, BoxError> {
        let responder = responder(self)?;
        responder.helper.edit_reply(self, text, markup).await
    }
}
