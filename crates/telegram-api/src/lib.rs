//! Minimal Telegram Bot API client.
//!
//! Covers the slice of the Bot API this bot needs: token
//! verification, long polling for message updates, and sending text
//! and media messages with optional reply markup. Errors classify
//! delivery failures so callers can tell "recipient unreachable" and
//! "back off" apart from everything else.
//!
//! # Example
//!
//! ```no_run
//! use telegram_api::{BotClient, BotConfig, UpdatePoller};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = BotClient::new(BotConfig::new("123:abc"))?;
//!     let me = client.get_me().await?;
//!     println!("polling as @{}", me.username.unwrap_or_default());
//!
//!     let mut poller = UpdatePoller::new(client);
//!     loop {
//!         let update = poller.next_update().await?;
//!         println!("update {}", update.update_id);
//!     }
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod poll;
pub mod types;

pub use client::BotClient;
pub use config::BotConfig;
pub use error::ApiError;
pub use poll::UpdatePoller;
pub use types::{
    Chat, Document, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, Message,
    PhotoSize, ReplyKeyboardMarkup, ReplyKeyboardRemove, ReplyMarkup, TgUser, Update, Video,
    Voice, WebAppInfo,
};
