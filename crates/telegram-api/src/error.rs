//! Error types for the Bot API client.

use thiserror::Error;

/// Errors that can occur when calling the Telegram Bot API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The recipient is unreachable: they blocked the bot or the chat
    /// no longer exists.
    #[error("recipient unreachable: {0}")]
    Forbidden(String),

    /// The API asked us to back off.
    #[error("rate limited, retry after {0}s")]
    RetryAfter(u64),

    /// Any other error response from the API.
    #[error("API error {code}: {description}")]
    Api { code: i64, description: String },
}

impl ApiError {
    /// Classify an error response body into an [`ApiError`].
    ///
    /// Mirrors how the Bot API reports delivery problems: 429 (or a
    /// `retry_after` parameter) means back off; 403, and 400 with a
    /// "blocked" or "chat not found" description, mean the recipient
    /// cannot be reached.
    pub fn from_response(
        code: i64,
        description: String,
        retry_after: Option<u64>,
    ) -> Self {
        if let Some(secs) = retry_after {
            return ApiError::RetryAfter(secs);
        }
        if code == 429 {
            return ApiError::RetryAfter(1);
        }

        let lowered = description.to_lowercase();
        if code == 403 || (code == 400 && (lowered.contains("blocked") || lowered.contains("chat not found"))) {
            return ApiError::Forbidden(description);
        }

        ApiError::Api { code, description }
    }

    /// Whether this error is a request timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Http(e) if e.is_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_retry_after() {
        let err = ApiError::from_response(429, "Too Many Requests".into(), Some(7));
        assert!(matches!(err, ApiError::RetryAfter(7)));

        // 429 without an explicit parameter still backs off.
        let err = ApiError::from_response(429, "Too Many Requests".into(), None);
        assert!(matches!(err, ApiError::RetryAfter(1)));
    }

    #[test]
    fn test_classify_blocked() {
        let err = ApiError::from_response(403, "Forbidden: bot was blocked by the user".into(), None);
        assert!(matches!(err, ApiError::Forbidden(_)));

        let err = ApiError::from_response(400, "Bad Request: chat not found".into(), None);
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn test_classify_generic() {
        let err = ApiError::from_response(400, "Bad Request: message is too long".into(), None);
        assert!(matches!(err, ApiError::Api { code: 400, .. }));
    }
}
