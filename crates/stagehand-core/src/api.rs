//! Outbound Bot API surface.
//!
//! The routing layer never talks to the network itself. A transport provides
//! a [`BotApi`] implementation and every [`Context`](crate::context::Context)
//! carries a shared handle to it.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;

/// One button of an inline keyboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineButton {
    /// Label shown to the user.
    pub text: String,
    /// Data delivered back in the callback query when pressed.
    pub callback_data: String,
}

impl InlineButton {
    /// Creates a callback button.
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: data.into(),
        }
    }
}

/// Markup attached to an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyMarkup {
    /// Rows of inline buttons.
    InlineKeyboard(Vec<Vec<InlineButton>>),
    /// Removes a previously shown custom keyboard.
    RemoveKeyboard,
}

impl ReplyMarkup {
    /// Creates an inline keyboard from rows of buttons.
    pub fn inline(rows: impl IntoIterator<Item = Vec<InlineButton>>) -> Self {
        Self::InlineKeyboard(rows.into_iter().collect())
    }
}

/// The Bot API calls the routing layer and its helpers rely on.
#[async_trait]
pub trait BotApi: Send + Sync + 'static {
    /// Sends a text message and returns the new message id.
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        markup: Option<&ReplyMarkup>,
    ) -> ApiResult<i64>;

    /// Replaces the text (and markup) of a previously sent message.
    async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        markup: Option<&ReplyMarkup>,
    ) -> ApiResult<()>;

    /// Acknowledges a callback query, optionally showing a notification.
    async fn answer_callback_query(&self, query_id: &str, text: Option<&str>) -> ApiResult<()>;
}

/// Shared handle to a Bot API implementation.
pub type BoxedApi = Arc<dyn BotApi>;
