//! Telegram bot for the Bloom flower shop.
//!
//! Long-polls the Bot API, registers users on contact, and drives the
//! admin broadcast flow. Launched broadcasts are delivered by a
//! background worker that survives across conversation turns.

mod config;
mod delivery;
mod handlers;

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use broadcast::{BroadcastQueue, Engine, QueueConfig, SenderConfig};
use database::Database;
use telegram_api::{BotClient, BotConfig, UpdatePoller};

use crate::config::Config;
use crate::delivery::TelegramContentSender;
use crate::handlers::Handler;

/// Backoff after a failed poll round.
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;

    // Connect to database
    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;

    // Verify the bot token before polling
    let client = BotClient::new(BotConfig::with_api_root(&config.api_root, &config.bot_token))?;
    let me = client.get_me().await?;
    info!(username = ?me.username, "Bot authorized");

    // Background delivery worker
    let sender = Arc::new(TelegramContentSender::new(client.clone()));
    let queue = BroadcastQueue::spawn(
        db.pool().clone(),
        sender,
        SenderConfig::default(),
        QueueConfig::default(),
    );

    let handler = Handler::new(
        client.clone(),
        Engine::new(db.pool().clone()),
        queue,
        db.pool().clone(),
        config.mini_app_url.clone(),
    );

    let mut poller = UpdatePoller::new(client);
    info!("Polling for updates");

    loop {
        tokio::select! {
            update = poller.next_update() => {
                match update {
                    Ok(update) => {
                        let update_id = update.update_id;
                        if let Err(e) = handler.handle_update(update).await {
                            error!(update_id, error = %e, "Failed to handle update");
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "Polling failed, backing off");
                        tokio::time::sleep(POLL_ERROR_BACKOFF).await;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    db.close().await;
    Ok(())
}
