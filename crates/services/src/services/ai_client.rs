//! Client for an OpenAI-compatible chat-completions endpoint.

use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

const DEFAULT_API_URL: &str = "https://ai.gateway.lovable.dev/v1/chat/completions";
const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";
const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Failures of the AI gateway, split by whether asking again can help.
#[derive(Debug, Clone, Error)]
pub enum AiClientError {
    #[error("AI_API_KEY is not set")]
    NotConfigured,
    #[error("gateway unreachable: {0}")]
    Unreachable(String),
    #[error("gateway rate limit reached")]
    RateLimited,
    #[error("gateway credits exhausted")]
    CreditsExhausted,
    #[error("gateway answered {status}")]
    Rejected { status: u16 },
    #[error("unexpected gateway reply: {0}")]
    BadReply(String),
}

impl AiClientError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Unreachable(_) | Self::RateLimited => true,
            Self::Rejected { status } => *status >= 500,
            _ => false,
        }
    }

    /// Status the server answers with when a generation fails.
    pub fn upstream_status(&self) -> u16 {
        match self {
            Self::RateLimited => 429,
            Self::CreditsExhausted => 402,
            Self::NotConfigured => 503,
            _ => 502,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Clone)]
pub struct AiClient {
    http: Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl AiClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

    /// Reads `AI_API_KEY`, and optionally `AI_MODEL` and `AI_API_URL`.
    pub fn from_env() -> Result<Self, AiClientError> {
        let api_key = std::env::var("AI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(AiClientError::NotConfigured)?;
        let mut client = Self::new(api_key, std::env::var("AI_MODEL").ok())?;
        if let Ok(url) = std::env::var("AI_API_URL") {
            client.api_url = url;
        }
        Ok(client)
    }

    pub fn new(api_key: String, model: Option<String>) -> Result<Self, AiClientError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("escola/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AiClientError::Unreachable(e.to_string()))?;

        Ok(Self {
            http,
            api_url: DEFAULT_API_URL.to_string(),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run a chat completion and return the first choice's text.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String, AiClientError> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: DEFAULT_TEMPERATURE,
        };

        let response = (|| async { self.send_request(&request).await })
            .retry(
                ExponentialBuilder::default()
                    .with_min_delay(Duration::from_secs(1))
                    .with_max_delay(Duration::from_secs(30))
                    .with_max_times(3)
                    .with_jitter(),
            )
            .when(AiClientError::is_transient)
            .notify(|e, dur| {
                warn!(
                    "AI request failed, retrying after {:.2}s: {}",
                    dur.as_secs_f64(),
                    e
                )
            })
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| AiClientError::BadReply("no content in response".to_string()))
    }

    async fn send_request(&self, request: &ChatRequest<'_>) -> Result<ChatResponse, AiClientError> {
        let res = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| AiClientError::Unreachable(e.to_string()))?;

        let status = res.status();
        if status.is_success() {
            return res
                .json::<ChatResponse>()
                .await
                .map_err(|e| AiClientError::BadReply(e.to_string()));
        }
        let body = res.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), body = %body, "AI gateway error");
        Err(rejection(status))
    }
}

fn rejection(status: StatusCode) -> AiClientError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => AiClientError::RateLimited,
        StatusCode::PAYMENT_REQUIRED => AiClientError::CreditsExhausted,
        s => AiClientError::Rejected { status: s.as_u16() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_statuses() {
        let limited = rejection(StatusCode::TOO_MANY_REQUESTS);
        assert!(limited.is_transient());
        assert_eq!(limited.upstream_status(), 429);

        let broke = rejection(StatusCode::PAYMENT_REQUIRED);
        assert!(!broke.is_transient());
        assert_eq!(broke.upstream_status(), 402);

        assert!(rejection(StatusCode::BAD_GATEWAY).is_transient());
        let bad_key = rejection(StatusCode::UNAUTHORIZED);
        assert!(!bad_key.is_transient());
        assert_eq!(bad_key.upstream_status(), 502);
    }

    #[test]
    fn request_shape() {
        let messages = [ChatMessage::system("s"), ChatMessage::user("u")];
        let body = serde_json::to_value(ChatRequest {
            model: DEFAULT_MODEL,
            messages: &messages,
            temperature: DEFAULT_TEMPERATURE,
        })
        .unwrap();
        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "u");
    }

    #[test]
    fn response_decodes_first_choice() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"1. Reduzir custos"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content, "1. Reduzir custos");
    }
}
