//! Simple echo bot example.
//!
//! Run with: TELEGRAM_BOT_TOKEN=123:abc cargo run --example echo_bot

use std::env;

use telegram_api::{BotClient, BotConfig, UpdatePoller};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let token = env::var("TELEGRAM_BOT_TOKEN")?;

    let client = BotClient::new(BotConfig::new(token))?;
    let me = client.get_me().await?;
    println!("Echoing as @{}", me.username.unwrap_or_default());

    let mut poller = UpdatePoller::new(client.clone());
    loop {
        let update = poller.next_update().await?;
        let Some(message) = update.message else {
            continue;
        };
        if let Some(text) = message.text {
            println!("<{}> {}", message.chat.id, text);
            client.send_message(message.chat.id, &text, None).await?;
        }
    }
}
