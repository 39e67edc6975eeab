//! Shared fixtures for unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use stagehand_core::{
    ApiError, ApiResult, BotApi, BoxedMiddleware, CallbackQuery, Context, Message, ReplyMarkup,
    Update, User, handler_fn,
};

/// An ordered, shareable list of labels.
#[derive(Clone, Default)]
pub(crate) struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    pub(crate) fn push(&self, entry: &str) {
        self.0.lock().push(entry.to_string());
    }

    pub(crate) fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

/// A terminal handler that records `name`.
pub(crate) fn record(log: &Log, name: &str) -> BoxedMiddleware {
    let log = log.clone();
    let name = name.to_string();
    handler_fn(move |_ctx| {
        log.push(&name);
        async { Ok(()) }
    })
}

/// A call made against [`RecordingApi`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ApiCall {
    Send { chat_id: i64, text: String },
    Edit { chat_id: i64, message_id: i64, text: String },
    Answer { query_id: String },
}

/// A Bot API that records calls and hands out increasing message ids.
#[derive(Default)]
pub(crate) struct RecordingApi {
    calls: Mutex<Vec<ApiCall>>,
    fail_edits: bool,
    fail_answers: bool,
}

impl RecordingApi {
    pub(crate) fn failing_edits() -> Self {
        Self {
            fail_edits: true,
            ..Self::default()
        }
    }

    pub(crate) fn failing_answers() -> Self {
        Self {
            fail_answers: true,
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl BotApi for RecordingApi {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        _markup: Option<&ReplyMarkup>,
    ) -> ApiResult<i64> {
        let mut calls = self.calls.lock();
        calls.push(ApiCall::Send {
            chat_id,
            text: text.to_string(),
        });
        Ok(1000 + calls.len() as i64)
    }

    async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        _markup: Option<&ReplyMarkup>,
    ) -> ApiResult<()> {
        if self.fail_edits {
            return Err(ApiError::Rejected {
                code: 400,
                description: "message can't be edited".into(),
            });
        }
        self.calls.lock().push(ApiCall::Edit {
            chat_id,
            message_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn answer_callback_query(&self, query_id: &str, _text: Option<&str>) -> ApiResult<()> {
        if self.fail_answers {
            return Err(ApiError::Transport("connection reset".into()));
        }
        self.calls.lock().push(ApiCall::Answer {
            query_id: query_id.to_string(),
        });
        Ok(())
    }
}

fn user(id: i64) -> User {
    User {
        id,
        username: None,
        first_name: "Tester".into(),
    }
}

/// A text-message context backed by a fresh [`RecordingApi`].
pub(crate) fn text_context(chat_id: i64, user_id: i64, text: &str) -> Arc<Context> {
    text_context_with(Arc::new(RecordingApi::default()), chat_id, user_id, text)
}

pub(crate) fn text_context_with(
    api: Arc<RecordingApi>,
    chat_id: i64,
    user_id: i64,
    text: &str,
) -> Arc<Context> {
    let update = Update::message(1, Message::text(1, chat_id, Some(user(user_id)), text));
    Context::new(update, api)
}

/// A callback-query context whose originating message is `message_id`.
pub(crate) fn callback_context_with(
    api: Arc<RecordingApi>,
    chat_id: i64,
    message_id: i64,
    data: &str,
) -> Arc<Context> {
    let query = CallbackQuery {
        id: "cb-1".into(),
        from: user(2),
        message: Some(Message::text(message_id, chat_id, None, "menu")),
        data: Some(data.to_string()),
    };
    Context::new(Update::callback_query(2, query), api)
}
