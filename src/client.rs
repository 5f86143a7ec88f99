use crate::protocol::{ChatRequest, ChatResponse, HealthStatus};
use crate::session::SessionId;
use reqwest::{Client as HttpClient, StatusCode, Url};
use std::error::Error;
use thiserror::Error;

type ClientResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Every way a single chat request can fail. All of them surface to the user
/// as the same fallback message; the detail only goes to the log.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("HTTP error! status: {0}")]
    Status(StatusCode),
    #[error("malformed response body: {0}")]
    Decode(#[source] serde_json::Error),
}

#[derive(Clone)]
pub struct ChatClient {
    endpoint: Url,
    http: HttpClient,
}

impl ChatClient {
    pub fn new(endpoint: &str) -> ClientResult<Self> {
        let endpoint = Url::parse(normalize_endpoint(endpoint))?;

        Ok(Self {
            endpoint,
            http: HttpClient::new(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Sends one message. Exactly one request per call: no retries, no timeout.
    pub async fn post_message(
        &self,
        message: &str,
        session_id: &SessionId,
    ) -> Result<ChatResponse, TransportError> {
        let request = ChatRequest {
            message: message.to_string(),
            session_id: session_id.as_str().to_string(),
        };

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .map_err(TransportError::Request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status));
        }

        let body = response.bytes().await.map_err(TransportError::Request)?;
        serde_json::from_slice(&body).map_err(TransportError::Decode)
    }

    /// The backend serves its health check next to the chat route
    /// (`/api/health` beside `/api/chat`).
    pub fn health_url(&self) -> ClientResult<Url> {
        Ok(self.endpoint.join("health")?)
    }

    pub async fn health(&self) -> ClientResult<HealthStatus> {
        let response = self.http.get(self.health_url()?).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Health check failed: {} - {}", status, body).into());
        }

        Ok(response.json().await?)
    }
}

fn normalize_endpoint(value: &str) -> &str {
    value.trim().trim_end_matches('/')
}
