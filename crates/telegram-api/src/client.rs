//! HTTP client for the Telegram Bot API.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::BotConfig;
use crate::error::ApiError;
use crate::types::{Message, ReplyMarkup, TgUser, Update};

/// Per-request timeout. Long polls get extra headroom on top of this.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Response envelope returned by every Bot API method.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default = "Option::default")]
    result: Option<T>,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

/// Client for the Telegram Bot API.
#[derive(Debug, Clone)]
pub struct BotClient {
    config: BotConfig,
    client: reqwest::Client,
}

impl BotClient {
    /// Create a new client from a configuration.
    pub fn new(config: BotConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { config, client })
    }

    /// Call a Bot API method with JSON parameters.
    async fn call<P: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        params: &P,
    ) -> Result<T, ApiError> {
        let url = self.config.method_url(method);
        let response = self.client.post(&url).json(params).send().await?;

        let envelope: ApiResponse<T> = response.json().await?;
        if envelope.ok {
            if let Some(result) = envelope.result {
                return Ok(result);
            }
        }

        let code = envelope.error_code.unwrap_or(0);
        let description = envelope
            .description
            .unwrap_or_else(|| "empty response".to_string());
        let retry_after = envelope.parameters.and_then(|p| p.retry_after);
        Err(ApiError::from_response(code, description, retry_after))
    }

    /// Verify the token by fetching the bot's own account.
    pub async fn get_me(&self) -> Result<TgUser, ApiError> {
        self.call("getMe", &serde_json::json!({})).await
    }

    /// Long-poll for updates after `offset`.
    ///
    /// `timeout_secs` is the server-side hold time. The HTTP timeout is
    /// widened so the long poll is not cut short on our side.
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, ApiError> {
        let url = self.config.method_url("getUpdates");
        let response = self
            .client
            .post(&url)
            .timeout(REQUEST_TIMEOUT + Duration::from_secs(timeout_secs))
            .json(&serde_json::json!({
                "offset": offset,
                "timeout": timeout_secs,
                "allowed_updates": ["message"],
            }))
            .send()
            .await?;

        let envelope: ApiResponse<Vec<Update>> = response.json().await?;
        if envelope.ok {
            return Ok(envelope.result.unwrap_or_default());
        }

        let code = envelope.error_code.unwrap_or(0);
        let description = envelope
            .description
            .unwrap_or_else(|| "empty response".to_string());
        let retry_after = envelope.parameters.and_then(|p| p.retry_after);
        Err(ApiError::from_response(code, description, retry_after))
    }

    /// Send a text message, optionally with reply markup.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_markup: Option<&ReplyMarkup>,
    ) -> Result<Message, ApiError> {
        let mut params = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(markup) = reply_markup {
            params["reply_markup"] = serde_json::to_value(markup)?;
        }
        self.call("sendMessage", &params).await
    }

    /// Send a photo by file_id.
    pub async fn send_photo(
        &self,
        chat_id: i64,
        file_id: &str,
        caption: &str,
    ) -> Result<Message, ApiError> {
        self.send_media("sendPhoto", "photo", chat_id, file_id, caption)
            .await
    }

    /// Send a video by file_id.
    pub async fn send_video(
        &self,
        chat_id: i64,
        file_id: &str,
        caption: &str,
    ) -> Result<Message, ApiError> {
        self.send_media("sendVideo", "video", chat_id, file_id, caption)
            .await
    }

    /// Send a document by file_id.
    pub async fn send_document(
        &self,
        chat_id: i64,
        file_id: &str,
        caption: &str,
    ) -> Result<Message, ApiError> {
        self.send_media("sendDocument", "document", chat_id, file_id, caption)
            .await
    }

    /// Send a voice note by file_id. Voice notes carry no caption.
    pub async fn send_voice(&self, chat_id: i64, file_id: &str) -> Result<Message, ApiError> {
        let params = serde_json::json!({
            "chat_id": chat_id,
            "voice": file_id,
        });
        self.call("sendVoice", &params).await
    }

    async fn send_media(
        &self,
        method: &str,
        field: &str,
        chat_id: i64,
        file_id: &str,
        caption: &str,
    ) -> Result<Message, ApiError> {
        let mut params = serde_json::json!({
            "chat_id": chat_id,
            field: file_id,
        });
        if !caption.is_empty() {
            params["caption"] = serde_json::Value::String(caption.to_string());
        }
        self.call(method, &params).await
    }
}
