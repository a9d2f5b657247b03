//! Data service spoken over HTTP to the `server` crate.

use std::sync::Arc;

use async_trait::async_trait;
use db::models::feedback::FeedbackInput;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::debug;
use utils::response::{ApiResponse, ErrorInfo};
use uuid::Uuid;

use super::{
    client_config::ClientConfig,
    data_service::{
        AuthBackend, Credentials, DataError, DataErrorKind, FeedbackSink, FunctionInvoker, Record,
        Repository, SessionInfo,
    },
    token_store::TokenStore,
};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Clone)]
pub struct HttpDataService {
    http: Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
}

impl HttpDataService {
    pub fn new(config: &ClientConfig, tokens: Arc<dyn TokenStore>) -> Result<Self, DataError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("escola/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DataError::transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Request with the persisted bearer token, if any.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match self.tokens.load() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn envelope<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        kind: DataErrorKind,
    ) -> Result<Option<T>, DataError> {
        let response = builder
            .send()
            .await
            .map_err(|e| DataError::transport(e.to_string()))?;
        decode(response, kind).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        kind: DataErrorKind,
    ) -> Result<T, DataError> {
        self.envelope(builder, kind)
            .await?
            .ok_or_else(|| DataError::new(DataErrorKind::Decode, "empty response"))
    }

    /// For endpoints that answer with an empty success envelope.
    async fn send_empty(&self, builder: RequestBuilder, kind: DataErrorKind) -> Result<(), DataError> {
        self.envelope::<Value>(builder, kind).await.map(|_| ())
    }
}

async fn decode<T: DeserializeOwned>(
    response: Response,
    kind: DataErrorKind,
) -> Result<Option<T>, DataError> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| DataError::transport(e.to_string()))?;

    if status.is_success() {
        let envelope: ApiResponse<T> = serde_json::from_slice(&body)
            .map_err(|e| DataError::new(DataErrorKind::Decode, e.to_string()).with_status(status.as_u16()))?;
        return Ok(envelope.into_data());
    }

    let kind = if status == StatusCode::UNAUTHORIZED {
        DataErrorKind::Auth
    } else {
        kind
    };
    let mut err = DataError::new(kind, format!("http {}", status.as_u16())).with_status(status.as_u16());
    if let Ok(envelope) = serde_json::from_slice::<ApiResponse<Value, ErrorInfo>>(&body) {
        if let Some(message) = envelope.message() {
            err.message = message.to_string();
        }
        if let Some(code) = envelope.error_data().and_then(|info| info.code.clone()) {
            err = err.with_code(code);
        }
    }
    debug!(status = status.as_u16(), code = ?err.code, "request failed");
    Err(err)
}

#[async_trait]
impl<R: Record> Repository<R> for HttpDataService {
    async fn list(&self) -> Result<Vec<R>, DataError> {
        self.send(self.request(Method::GET, R::ENDPOINT), DataErrorKind::Database)
            .await
    }

    async fn insert(&self, input: &R::Input) -> Result<R, DataError> {
        self.send(
            self.request(Method::POST, R::ENDPOINT).json(input),
            DataErrorKind::Database,
        )
        .await
    }

    async fn update(&self, id: Uuid, input: &R::Input) -> Result<R, DataError> {
        let path = format!("{}/{id}", R::ENDPOINT);
        self.send(self.request(Method::PUT, &path).json(input), DataErrorKind::Database)
            .await
    }

    async fn remove(&self, id: Uuid) -> Result<(), DataError> {
        let path = format!("{}/{id}", R::ENDPOINT);
        self.send_empty(self.request(Method::DELETE, &path), DataErrorKind::Database)
            .await
    }
}

#[async_trait]
impl FunctionInvoker for HttpDataService {
    async fn invoke(&self, name: &str, payload: Value) -> Result<Value, DataError> {
        let path = format!("/api/functions/{name}");
        self.send(self.request(Method::POST, &path).json(&payload), DataErrorKind::Function)
            .await
    }
}

#[async_trait]
impl FeedbackSink for HttpDataService {
    async fn submit_feedback(&self, input: &FeedbackInput) -> Result<(), DataError> {
        self.send_empty(
            self.request(Method::POST, "/api/feedback").json(input),
            DataErrorKind::Database,
        )
        .await
    }
}

#[async_trait]
impl AuthBackend for HttpDataService {
    async fn sign_in(&self, credentials: &Credentials) -> Result<String, DataError> {
        let form = TokenRequest {
            username: &credentials.email,
            password: &credentials.password,
        };
        let builder = self.http.post(self.url("/api/auth/token")).form(&form);
        let token: TokenResponse = self.send(builder, DataErrorKind::Auth).await?;
        Ok(token.access_token)
    }

    async fn sign_out(&self, _token: &str) -> Result<(), DataError> {
        // Stateless tokens: forgetting the token locally is the sign-out.
        Ok(())
    }

    async fn get_session(&self, token: &str) -> Result<SessionInfo, DataError> {
        let builder = self.http.get(self.url("/api/auth/session")).bearer_auth(token);
        self.send(builder, DataErrorKind::Auth).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{data_service::codes, token_store::MemoryTokenStore};

    #[tokio::test]
    async fn unreachable_server_is_transport() {
        let config = ClientConfig {
            api_base_url: "http://127.0.0.1:9".into(),
            ..ClientConfig::default()
        };
        let data = HttpDataService::new(&config, Arc::new(MemoryTokenStore::default())).unwrap();
        let err = data
            .sign_in(&Credentials {
                email: "a@b.pt".into(),
                password: "12345678".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, DataErrorKind::Transport);
        assert!(!err.is_code(codes::INVALID_CREDENTIALS));
    }

    #[test]
    fn urls_join_without_double_slash() {
        let config = ClientConfig {
            api_base_url: "http://localhost:8000/".into(),
            ..ClientConfig::default()
        };
        let data = HttpDataService::new(&config, Arc::new(MemoryTokenStore::default())).unwrap();
        assert_eq!(data.url("/api/students"), "http://localhost:8000/api/students");
    }
}
