//! HTTP client for the research-assistant server.

use std::time::Duration;

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, Response};
use scriba_protocol::{ChatRequest, ConversationSummary, Message};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Raw response body of a chat submission.
pub type ByteStream = BoxStream<'static, Result<Bytes, reqwest::Error>>;

const EVENT_STREAM: &str = "text/event-stream";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("server response has no body to stream")]
    NoBody,
}

/// Connection settings for `ChatClient`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(300),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }
}

/// Research-assistant API client.
pub struct ChatClient {
    base_url: String,
    api_token: Option<String>,
    http: Client,
}

impl ChatClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(2)
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Submit a query and return the response body as a byte stream.
    ///
    /// Fails if the request cannot be sent, the server answers with a
    /// non-success status, or the response announces an empty body.
    pub async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, ClientError> {
        let builder = self
            .http
            .post(self.url("chat"))
            .header(reqwest::header::ACCEPT, EVENT_STREAM)
            .json(request);
        let response = check_status(self.authorized(builder).send().await?).await?;

        if response.content_length() == Some(0) {
            return Err(ClientError::NoBody);
        }

        tracing::debug!(url = %response.url(), "chat stream opened");
        Ok(response.bytes_stream().boxed())
    }

    /// Fetch the stored messages of a conversation.
    pub async fn load_history(&self, conversation_id: &str) -> Result<Vec<Message>, ClientError> {
        self.get_json(&format!("conversations/{conversation_id}/messages"))
            .await
    }

    /// Fetch the list of the user's conversations.
    pub async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, ClientError> {
        self.get_json("conversations").await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let builder = self.http.get(self.url(path));
        let response = check_status(self.authorized(builder).send().await?).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

async fn check_status(response: Response) -> Result<Response, ClientError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Status { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = ClientConfig::new("http://localhost:8000");
        assert_eq!(config.api_token, None);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(300));

        let config = config.with_token("secret");
        assert_eq!(config.api_token.as_deref(), Some("secret"));
    }

    #[test]
    fn url_joining() {
        let client = ChatClient::new(ClientConfig::new("http://localhost:8000/api/")).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000/api");
        assert_eq!(client.url("chat"), "http://localhost:8000/api/chat");
        assert_eq!(
            client.url("/conversations"),
            "http://localhost:8000/api/conversations"
        );
    }

    #[test]
    fn status_error_message() {
        let err = ClientError::Status {
            status: 401,
            body: "unauthorized".to_string(),
        };
        assert_eq!(err.to_string(), "server returned 401: unauthorized");
    }
}
