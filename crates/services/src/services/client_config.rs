use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Settings of the client core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub request_timeout: Duration,
    /// How often the session holder checks for token expiry.
    pub expiry_check_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            expiry_check_interval: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    /// `API_BASE_URL` overrides the server address.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("API_BASE_URL") {
            let url = url.trim().trim_end_matches('/');
            if !url.is_empty() {
                config.api_base_url = url.to_string();
            }
        }
        config
    }
}
