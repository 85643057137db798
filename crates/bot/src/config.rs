//! Configuration loaded from environment variables.

use std::env;

use telegram_api::BotConfig;

/// Bot process configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bot token issued by BotFather.
    pub bot_token: String,
    /// SQLite database URL.
    pub database_url: String,
    /// Bot API root.
    pub api_root: String,
    /// Mini-App storefront URL for the /start button, if deployed.
    pub mini_app_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `TELEGRAM_BOT_TOKEN` | Bot token | (required) |
    /// | `SQLITE_PATH` | SQLite database URL | `sqlite:bloom.db?mode=rwc` |
    /// | `TELEGRAM_API_ROOT` | Bot API root | `https://api.telegram.org` |
    /// | `MINI_APP_URL` | Mini-App storefront URL | (none) |
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token =
            env::var("TELEGRAM_BOT_TOKEN").map_err(|_| ConfigError::MissingBotToken)?;

        let database_url =
            env::var("SQLITE_PATH").unwrap_or_else(|_| "sqlite:bloom.db?mode=rwc".to_string());

        let api_root = env::var("TELEGRAM_API_ROOT")
            .unwrap_or_else(|_| BotConfig::DEFAULT_API_ROOT.to_string());

        let mini_app_url = env::var("MINI_APP_URL").ok().filter(|url| !url.is_empty());

        Ok(Self {
            bot_token,
            database_url,
            api_root,
            mini_app_url,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("TELEGRAM_BOT_TOKEN environment variable is required")]
    MissingBotToken,
}
