#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use stagehand_core::{
    ApiResult, BotApi, BoxedMiddleware, CallbackQuery, Message, ReplyMarkup, Update, User,
    handler_fn,
};

/// Outgoing messages, as `(chat_id, text)`.
#[derive(Default)]
pub struct RecordingApi {
    pub sent: Mutex<Vec<(i64, String)>>,
    pub edited: Mutex<Vec<(i64, i64, String)>>,
}

#[async_trait]
impl BotApi for RecordingApi {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        _markup: Option<&ReplyMarkup>,
    ) -> ApiResult<i64> {
        let mut sent = self.sent.lock();
        sent.push((chat_id, text.to_string()));
        Ok(sent.len() as i64)
    }

    async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        _markup: Option<&ReplyMarkup>,
    ) -> ApiResult<()> {
        self.edited
            .lock()
            .push((chat_id, message_id, text.to_string()));
        Ok(())
    }

    async fn answer_callback_query(&self, _query_id: &str, _text: Option<&str>) -> ApiResult<()> {
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    pub fn push(&self, entry: &str) {
        self.0.lock().push(entry.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

pub fn record(log: &Log, name: &str) -> BoxedMiddleware {
    let log = log.clone();
    let name = name.to_string();
    handler_fn(move |_ctx| {
        log.push(&name);
        async { Ok(()) }
    })
}

fn user() -> User {
    User {
        id: 42,
        username: Some("tester".into()),
        first_name: "Tester".into(),
    }
}

pub fn text(update_id: i64, text: &str) -> Update {
    Update::message(update_id, Message::text(update_id, 7, Some(user()), text))
}

pub fn press(update_id: i64, data: &str) -> Update {
    Update::callback_query(
        update_id,
        CallbackQuery {
            id: format!("cb-{update_id}"),
            from: user(),
            message: Some(Message::text(900, 7, None, "menu")),
            data: Some(data.to_string()),
        },
    )
}
