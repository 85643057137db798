//! Bot API wire types, limited to the fields this bot consumes.

use serde::{Deserialize, Serialize};

/// An incoming update from `getUpdates`.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    /// Monotonic update id, used as the polling offset.
    pub update_id: i64,
    /// New incoming message, if this update carries one.
    #[serde(default)]
    pub message: Option<Message>,
}

/// A Telegram message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<TgUser>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    /// Photo size variants, largest last.
    #[serde(default)]
    pub photo: Vec<PhotoSize>,
    #[serde(default)]
    pub video: Option<Video>,
    #[serde(default)]
    pub document: Option<Document>,
    #[serde(default)]
    pub voice: Option<Voice>,
}

impl Message {
    /// The file_id of the largest photo variant, if any.
    pub fn photo_file_id(&self) -> Option<&str> {
        self.photo.last().map(|p| p.file_id.as_str())
    }
}

/// A Telegram user or bot.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TgUser {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: String,
}

/// A chat (only the id is needed for replies).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// One size variant of a photo.
#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
}

/// A video attachment.
#[derive(Debug, Clone, Deserialize)]
pub struct Video {
    pub file_id: String,
}

/// A document attachment.
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub file_id: String,
}

/// A voice note.
#[derive(Debug, Clone, Deserialize)]
pub struct Voice {
    pub file_id: String,
}

/// Reply markup attached to an outgoing message.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    Keyboard(ReplyKeyboardMarkup),
    Remove(ReplyKeyboardRemove),
    Inline(InlineKeyboardMarkup),
}

impl ReplyMarkup {
    /// A one-time resizing reply keyboard from button label rows.
    pub fn keyboard(rows: Vec<Vec<&str>>) -> Self {
        ReplyMarkup::Keyboard(ReplyKeyboardMarkup {
            keyboard: rows
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|text| KeyboardButton {
                            text: text.to_string(),
                        })
                        .collect()
                })
                .collect(),
            one_time_keyboard: true,
            resize_keyboard: true,
        })
    }

    /// Markup that removes the current reply keyboard.
    pub fn remove() -> Self {
        ReplyMarkup::Remove(ReplyKeyboardRemove {
            remove_keyboard: true,
        })
    }

    /// A single inline button opening a web app.
    pub fn web_app_button(text: impl Into<String>, url: impl Into<String>) -> Self {
        ReplyMarkup::Inline(InlineKeyboardMarkup {
            inline_keyboard: vec![vec![InlineKeyboardButton {
                text: text.into(),
                web_app: Some(WebAppInfo { url: url.into() }),
            }]],
        })
    }
}

/// A custom reply keyboard.
#[derive(Debug, Clone, Serialize)]
pub struct ReplyKeyboardMarkup {
    pub keyboard: Vec<Vec<KeyboardButton>>,
    pub one_time_keyboard: bool,
    pub resize_keyboard: bool,
}

/// One reply keyboard button.
#[derive(Debug, Clone, Serialize)]
pub struct KeyboardButton {
    pub text: String,
}

/// Markup removing the reply keyboard.
#[derive(Debug, Clone, Serialize)]
pub struct ReplyKeyboardRemove {
    pub remove_keyboard: bool,
}

/// An inline keyboard.
#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

/// One inline keyboard button.
#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_app: Option<WebAppInfo>,
}

/// Web app info for an inline button.
#[derive(Debug, Clone, Serialize)]
pub struct WebAppInfo {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_photo_update() {
        let raw = r#"{
            "update_id": 10,
            "message": {
                "message_id": 1,
                "from": {"id": 42, "username": "alice", "first_name": "Alice"},
                "chat": {"id": 42},
                "caption": "look",
                "photo": [{"file_id": "small"}, {"file_id": "big"}]
            }
        }"#;

        let update: Update = serde_json::from_str(raw).unwrap();
        let message = update.message.unwrap();
        assert_eq!(message.photo_file_id(), Some("big"));
        assert_eq!(message.caption.as_deref(), Some("look"));
        assert_eq!(message.from.unwrap().id, 42);
    }

    #[test]
    fn test_reply_markup_serializes_flat() {
        let markup = ReplyMarkup::remove();
        let json = serde_json::to_value(&markup).unwrap();
        assert_eq!(json["remove_keyboard"], true);

        let markup = ReplyMarkup::keyboard(vec![vec!["a", "b"]]);
        let json = serde_json::to_value(&markup).unwrap();
        assert_eq!(json["keyboard"][0][1]["text"], "b");
    }
}
