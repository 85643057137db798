//! Configuration types for the Bot API client.

/// Configuration for connecting to the Telegram Bot API.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// API root (e.g., "https://api.telegram.org"). Overridable for
    /// local Bot API servers and tests.
    pub api_root: String,
    /// Bot token issued by BotFather.
    pub token: String,
}

impl BotConfig {
    /// Default Telegram Bot API root.
    pub const DEFAULT_API_ROOT: &'static str = "https://api.telegram.org";

    /// Create a new configuration with the default API root.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            api_root: Self::DEFAULT_API_ROOT.to_string(),
            token: token.into(),
        }
    }

    /// Create a configuration with a custom API root.
    pub fn with_api_root(api_root: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            api_root: api_root.into(),
            token: token.into(),
        }
    }

    /// Get the endpoint URL for a Bot API method.
    pub fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_root, self.token, method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_url() {
        let config = BotConfig::new("123:abc");
        assert_eq!(
            config.method_url("sendMessage"),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn test_custom_api_root() {
        let config = BotConfig::with_api_root("http://localhost:8081", "t");
        assert_eq!(
            config.method_url("getMe"),
            "http://localhost:8081/bott/getMe"
        );
    }
}
