//! Content delivery over the Bot API.

use async_trait::async_trait;

use broadcast::{BroadcastContent, ContentSender, SendOutcome};
use telegram_api::{ApiError, BotClient};

/// Send one piece of broadcast content to a chat.
pub async fn send_content(
    client: &BotClient,
    chat_id: i64,
    content: &BroadcastContent,
) -> Result<(), ApiError> {
    match content {
        BroadcastContent::Text { body } => {
            client.send_message(chat_id, body, None).await?;
        }
        BroadcastContent::Photo { file_id, caption } => {
            client.send_photo(chat_id, file_id, caption).await?;
        }
        BroadcastContent::Video { file_id, caption } => {
            client.send_video(chat_id, file_id, caption).await?;
        }
        BroadcastContent::Document { file_id, caption } => {
            client.send_document(chat_id, file_id, caption).await?;
        }
        BroadcastContent::Voice { file_id } => {
            client.send_voice(chat_id, file_id).await?;
        }
    }
    Ok(())
}

/// [`ContentSender`] backed by the Bot API client.
pub struct TelegramContentSender {
    client: BotClient,
}

impl TelegramContentSender {
    pub fn new(client: BotClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ContentSender for TelegramContentSender {
    async fn send(&self, telegram_id: i64, content: &BroadcastContent) -> SendOutcome {
        match send_content(&self.client, telegram_id, content).await {
            Ok(()) => SendOutcome::Sent,
            Err(ApiError::Forbidden(reason)) => SendOutcome::Blocked(reason),
            Err(ApiError::RetryAfter(secs)) => SendOutcome::RateLimited(secs),
            Err(error) if error.is_timeout() => SendOutcome::Failed("request timeout".to_string()),
            Err(error) => SendOutcome::Failed(error.to_string()),
        }
    }
}
