//! Inbound update model.
//!
//! An [`Update`] is one inbound message or event delivered by the transport.
//! Only the fields the routing layer inspects are modelled; transports keep
//! anything else to themselves.
//!
//! ```text
//! Update { update_id }
//! ├── UpdateKind::Message(Message { message_id, chat, from, text, caption, media })
//! └── UpdateKind::CallbackQuery(CallbackQuery { id, from, message, data })
//! ```

use serde::{Deserialize, Serialize};

// ============================================================================
// Shared Types
// ============================================================================

/// A chat an update belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    /// Chat identifier.
    pub id: i64,
}

/// The user that caused an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User identifier.
    pub id: i64,
    /// Public handle without the leading `@`.
    #[serde(default)]
    pub username: Option<String>,
    /// Display name.
    #[serde(default)]
    pub first_name: String,
}

/// Non-text payload carried by a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Media {
    /// A photo, referenced by its largest size.
    Photo { file_id: String },
    /// A general file.
    Document { file_id: String, file_name: Option<String> },
    /// A sticker.
    Sticker { file_id: String },
    /// A voice note.
    Voice { file_id: String },
    /// A video.
    Video { file_id: String },
    /// An audio track.
    Audio { file_id: String },
    /// A point on the map.
    Location { latitude: f64, longitude: f64 },
    /// A shared phone contact.
    Contact { phone_number: String, first_name: String },
}

/// A field a message may or may not carry.
///
/// Event listeners declare a list of these; a message matches when it carries
/// every one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageField {
    /// The message has a text body.
    Text,
    /// The message has a caption.
    Caption,
    /// The media is a [`Media::Photo`].
    Photo,
    /// The media is a [`Media::Document`].
    Document,
    /// The media is a [`Media::Sticker`].
    Sticker,
    /// The media is a [`Media::Voice`].
    Voice,
    /// The media is a [`Media::Video`].
    Video,
    /// The media is a [`Media::Audio`].
    Audio,
    /// The media is a [`Media::Location`].
    Location,
    /// The media is a [`Media::Contact`].
    Contact,
    /// The message replies to another one.
    ReplyToMessage,
}

// ============================================================================
// Message
// ============================================================================

/// A chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message identifier, unique within its chat.
    pub message_id: i64,
    /// The chat the message was sent to.
    pub chat: Chat,
    /// The sender; absent for channel posts.
    #[serde(default)]
    pub from: Option<User>,
    /// Text body.
    #[serde(default)]
    pub text: Option<String>,
    /// Caption attached to media.
    #[serde(default)]
    pub caption: Option<String>,
    /// Attached media.
    #[serde(default)]
    pub media: Option<Media>,
    /// The message this one replies to.
    #[serde(default)]
    pub reply_to_message_id: Option<i64>,
}

impl Message {
    /// Creates a plain text message.
    pub fn text(message_id: i64, chat_id: i64, from: Option<User>, text: impl Into<String>) -> Self {
        Self {
            message_id,
            chat: Chat { id: chat_id },
            from,
            text: Some(text.into()),
            caption: None,
            media: None,
            reply_to_message_id: None,
        }
    }

    /// Returns `true` if the message carries `field`.
    pub fn has(&self, field: MessageField) -> bool {
        match field {
            MessageField::Text => self.text.is_some(),
            MessageField::Caption => self.caption.is_some(),
            MessageField::ReplyToMessage => self.reply_to_message_id.is_some(),
            MessageField::Photo => matches!(self.media, Some(Media::Photo { .. })),
            MessageField::Document => matches!(self.media, Some(Media::Document { .. })),
            MessageField::Sticker => matches!(self.media, Some(Media::Sticker { .. })),
            MessageField::Voice => matches!(self.media, Some(Media::Voice { .. })),
            MessageField::Video => matches!(self.media, Some(Media::Video { .. })),
            MessageField::Audio => matches!(self.media, Some(Media::Audio { .. })),
            MessageField::Location => matches!(self.media, Some(Media::Location { .. })),
            MessageField::Contact => matches!(self.media, Some(Media::Contact { .. })),
        }
    }

    /// Returns `true` if the message carries every field in `fields`.
    ///
    /// An empty list matches any message.
    pub fn has_all(&self, fields: &[MessageField]) -> bool {
        fields.iter().all(|f| self.has(*f))
    }
}

// ============================================================================
// CallbackQuery
// ============================================================================

/// A press on an inline keyboard button.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackQuery {
    /// Query identifier, used to acknowledge the press.
    pub id: String,
    /// The user that pressed the button.
    pub from: User,
    /// The message the keyboard was attached to.
    #[serde(default)]
    pub message: Option<Message>,
    /// Callback data of the pressed button.
    #[serde(default)]
    pub data: Option<String>,
}

// ============================================================================
// Update
// ============================================================================

/// The payload of an [`Update`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    /// A new chat message.
    Message(Message),
    /// A press on an inline keyboard button.
    CallbackQuery(CallbackQuery),
}

/// One inbound message or event from the messaging platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    /// Monotonic update identifier assigned by the platform.
    pub update_id: i64,
    /// The update payload.
    #[serde(flatten)]
    pub kind: UpdateKind,
}

impl Update {
    /// Wraps a message in an update.
    pub fn message(update_id: i64, message: Message) -> Self {
        Self {
            update_id,
            kind: UpdateKind::Message(message),
        }
    }

    /// Wraps a callback query in an update.
    pub fn callback_query(update_id: i64, query: CallbackQuery) -> Self {
        Self {
            update_id,
            kind: UpdateKind::CallbackQuery(query),
        }
    }

    /// Returns the event name used in logs.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            UpdateKind::Message(_) => "message",
            UpdateKind::CallbackQuery(_) => "callback_query",
        }
    }

    /// Returns the message, if this is a message update.
    pub fn as_message(&self) -> Option<&Message> {
        match &self.kind {
            UpdateKind::Message(m) => Some(m),
            UpdateKind::CallbackQuery(_) => None,
        }
    }

    /// Returns the callback query, if this is a callback update.
    pub fn as_callback_query(&self) -> Option<&CallbackQuery> {
        match &self.kind {
            UpdateKind::CallbackQuery(q) => Some(q),
            UpdateKind::Message(_) => None,
        }
    }

    /// Returns the chat this update belongs to.
    ///
    /// Callback queries borrow the chat of the message carrying the keyboard.
    pub fn chat_id(&self) -> Option<i64> {
        match &self.kind {
            UpdateKind::Message(m) => Some(m.chat.id),
            UpdateKind::CallbackQuery(q) => q.message.as_ref().map(|m| m.chat.id),
        }
    }

    /// Returns the user that caused this update.
    pub fn from(&self) -> Option<&User> {
        match &self.kind {
            UpdateKind::Message(m) => m.from.as_ref(),
            UpdateKind::CallbackQuery(q) => Some(&q.from),
        }
    }

    /// Returns the message text, if any.
    pub fn text(&self) -> Option<&str> {
        self.as_message().and_then(|m| m.text.as_deref())
    }

    /// Returns the callback data, if any.
    pub fn callback_data(&self) -> Option<&str> {
        self.as_callback_query().and_then(|q| q.data.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo_message() -> Message {
        Message {
            message_id: 7,
            chat: Chat { id: 1 },
            from: None,
            text: None,
            caption: Some("look".into()),
            media: Some(Media::Photo {
                file_id: "abc".into(),
            }),
            reply_to_message_id: None,
        }
    }

    #[test]
    fn test_has_all_requires_every_field() {
        let msg = photo_message();
        assert!(msg.has_all(&[MessageField::Photo]));
        assert!(msg.has_all(&[MessageField::Photo, MessageField::Caption]));
        assert!(!msg.has_all(&[MessageField::Photo, MessageField::Text]));
        assert!(msg.has_all(&[]));
    }

    #[test]
    fn test_callback_query_borrows_message_chat() {
        let update = Update::callback_query(
            3,
            CallbackQuery {
                id: "q".into(),
                from: User {
                    id: 9,
                    username: None,
                    first_name: "Ann".into(),
                },
                message: Some(Message::text(4, 42, None, "pick one")),
                data: Some("buy".into()),
            },
        );

        assert_eq!(update.chat_id(), Some(42));
        assert_eq!(update.from().map(|u| u.id), Some(9));
        assert_eq!(update.callback_data(), Some("buy"));
        assert_eq!(update.text(), None);
    }

    #[test]
    fn test_update_deserializes_from_platform_json() {
        let raw = r#"{
            "update_id": 10,
            "message": {
                "message_id": 1,
                "chat": { "id": 5 },
                "from": { "id": 6, "first_name": "Bo" },
                "text": "/start"
            }
        }"#;
        let update: Update = serde_json::from_str(raw).unwrap();
        assert_eq!(update.kind_name(), "message");
        assert_eq!(update.text(), Some("/start"));
        assert_eq!(update.chat_id(), Some(5));
    }
}
