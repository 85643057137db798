//! Update routing: commands, conversation messages, user registration.

use thiserror::Error;

use broadcast::{BroadcastQueue, Engine, Inbound, Keyboard, Outcome, Reply};
use database::{user, DatabaseError, SqlitePool};
use telegram_api::{ApiError, BotClient, Message, ReplyMarkup, Update};

use crate::delivery::send_content;

/// Errors surfaced while handling a single update.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Broadcast error: {0}")]
    Broadcast(#[from] broadcast::BroadcastError),
}

/// Routes inbound updates to the /start flow or the broadcast engine.
pub struct Handler {
    client: BotClient,
    engine: Engine,
    queue: BroadcastQueue,
    pool: SqlitePool,
    mini_app_url: Option<String>,
}

impl Handler {
    pub fn new(
        client: BotClient,
        engine: Engine,
        queue: BroadcastQueue,
        pool: SqlitePool,
        mini_app_url: Option<String>,
    ) -> Self {
        Self {
            client,
            engine,
            queue,
            pool,
            mini_app_url,
        }
    }

    /// Handle one update end to end.
    pub async fn handle_update(&self, update: Update) -> Result<(), HandlerError> {
        let Some(message) = update.message else {
            return Ok(());
        };
        let Some(from) = message.from.clone() else {
            return Ok(());
        };

        // Every interaction registers the user and refreshes last_seen,
        // which feeds the NEW and INACTIVE audiences.
        user::register_telegram_user(
            &self.pool,
            from.id,
            from.username.as_deref(),
            Some(&from.first_name),
        )
        .await?;

        let chat_id = message.chat.id;
        let text = message.text.as_deref().unwrap_or("");

        if text.starts_with("/start") {
            return self.handle_start(chat_id).await;
        }

        let outcome = if text.starts_with("/broadcast") {
            self.engine.start(from.id, from.username.as_deref()).await?
        } else {
            self.engine.handle_message(from.id, &to_inbound(&message)).await?
        };

        self.render(chat_id, outcome).await
    }

    async fn handle_start(&self, chat_id: i64) -> Result<(), HandlerError> {
        let text = "🌸 Добро пожаловать в цветочный магазин Bloom!\n\n\
                    Здесь можно заказать букеты с доставкой.";
        let markup = self
            .mini_app_url
            .as_deref()
            .map(|url| ReplyMarkup::web_app_button("🌸 Открыть магазин", url));

        self.client
            .send_message(chat_id, text, markup.as_ref())
            .await?;
        Ok(())
    }

    /// Send the engine's replies and enqueue a launched broadcast.
    async fn render(&self, chat_id: i64, outcome: Outcome) -> Result<(), HandlerError> {
        for reply in outcome.replies {
            match reply {
                Reply::Prompt { text, keyboard } => {
                    let markup = markup_for(keyboard);
                    self.client
                        .send_message(chat_id, &text, markup.as_ref())
                        .await?;
                }
                Reply::Preview(content) => {
                    send_content(&self.client, chat_id, &content).await?;
                }
            }
        }

        if let Some(broadcast_id) = outcome.launched {
            self.queue.enqueue(broadcast_id);
        }

        Ok(())
    }
}

/// Map an engine keyboard to Bot API reply markup.
fn markup_for(keyboard: Keyboard) -> Option<ReplyMarkup> {
    match keyboard {
        Keyboard::None => None,
        Keyboard::Remove => Some(ReplyMarkup::remove()),
        other => other.rows().map(ReplyMarkup::keyboard),
    }
}

/// Reduce a message to the fields the conversation flow inspects.
fn to_inbound(message: &Message) -> Inbound {
    Inbound {
        text: message.text.clone(),
        caption: message.caption.clone(),
        photo_file_id: message.photo_file_id().map(str::to_string),
        video_file_id: message.video.as_ref().map(|v| v.file_id.clone()),
        document_file_id: message.document.as_ref().map(|d| d.file_id.clone()),
        voice_file_id: message.voice.as_ref().map(|v| v.file_id.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telegram_api::{Chat, PhotoSize};

    #[test]
    fn test_to_inbound_picks_largest_photo() {
        let message = Message {
            message_id: 1,
            from: None,
            chat: Chat { id: 1 },
            text: None,
            caption: Some("cap".into()),
            photo: vec![
                PhotoSize {
                    file_id: "small".into(),
                },
                PhotoSize {
                    file_id: "big".into(),
                },
            ],
            video: None,
            document: None,
            voice: None,
        };

        let inbound = to_inbound(&message);
        assert_eq!(inbound.photo_file_id.as_deref(), Some("big"));
        assert_eq!(inbound.caption.as_deref(), Some("cap"));
        assert!(inbound.text.is_none());
    }

    #[test]
    fn test_markup_for_keyboards() {
        assert!(markup_for(Keyboard::None).is_none());
        assert!(matches!(
            markup_for(Keyboard::Remove),
            Some(ReplyMarkup::Remove(_))
        ));
        assert!(matches!(
            markup_for(Keyboard::Confirm),
            Some(ReplyMarkup::Keyboard(_))
        ));
    }
}
