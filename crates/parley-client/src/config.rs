//! Client configuration.
//!
//! Connection settings are read from environment variables, with defaults
//! suitable for a locally running backend:
//!
//! - `PARLEY_API_URL` — base URL of the answering backend
//! - `PARLEY_API_KEY` — optional API key sent with answer requests
//! - `PARLEY_STREAMING` — `false`/`0` selects the non-streaming answer path

use std::env;

use parley_core::conversation::AnswerMode;

/// Base URL used when `PARLEY_API_URL` is not set.
pub const DEFAULT_API_URL: &str = "http://localhost:7091";

/// Connection settings for the HTTP services.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the answering backend, without a trailing slash.
    pub api_url: String,
    /// API key sent with answer requests, if the backend requires one.
    pub api_key: Option<String>,
    /// Which answer path the backend is driven through.
    pub mode: AnswerMode,
}

impl ClientConfig {
    /// Creates a streaming configuration for the given base URL.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: None,
            mode: AnswerMode::Streaming,
        }
    }

    /// Loads the configuration from environment variables.
    pub fn from_env() -> Self {
        let api_url =
            env::var("PARLEY_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let api_key = env::var("PARLEY_API_KEY").ok();
        let mode = match env::var("PARLEY_STREAMING").as_deref() {
            Ok("false") | Ok("0") => AnswerMode::Atomic,
            _ => AnswerMode::Streaming,
        };

        Self {
            api_url,
            api_key,
            mode,
        }
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the answer path.
    pub fn with_mode(mut self, mode: AnswerMode) -> Self {
        self.mode = mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = ClientConfig::new("http://example.test")
            .with_api_key("secret")
            .with_mode(AnswerMode::Atomic);

        assert_eq!(config.api_url, "http://example.test");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.mode, AnswerMode::Atomic);
    }
}
