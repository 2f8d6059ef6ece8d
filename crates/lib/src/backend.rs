//! Remote chat service client.
//!
//! The service is opaque to this crate: five endpoints, bearer + api-key
//! headers, JSON bodies. [`ChatBackend`] is the seam the session drives so
//! tests can script replies without a network.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::session::Message;

/// Assistant reply to one sent message.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct ContextResponse {
    contexto: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    history: Vec<Message>,
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("chat request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("chat api error: {0}")]
    Api(String),
}

/// The remote operations the session orchestrates. Bearer token is optional
/// on read paths; those calls degrade to defaults when they fail anyway.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// GET /get_contexto — name of the merchant context currently in effect.
    async fn active_context(&self, token: Option<&str>) -> Result<String, BackendError>;

    /// GET /get_contexto/{name} — confirmation ping; the response body carries
    /// nothing this client uses.
    async fn confirm_context(&self, name: &str, token: Option<&str>) -> Result<(), BackendError>;

    /// GET /history — server-side transcript for the session.
    async fn history(&self, session_id: &str, token: Option<&str>)
        -> Result<Vec<Message>, BackendError>;

    /// POST /chat — send one user message, get the assistant reply.
    async fn send(&self, message: &str, token: &str) -> Result<ChatReply, BackendError>;

    /// POST /reset — discard the server-side conversation.
    async fn reset(&self) -> Result<(), BackendError>;
}

/// reqwest-backed [`ChatBackend`] against the hosted chat service.
#[derive(Clone)]
pub struct ChatClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl ChatClient {
    /// Build a client with a bounded per-request timeout so a dead backend
    /// cannot hang a send indefinitely.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    fn get(&self, path: &str, token: Option<&str>) -> reqwest::RequestBuilder {
        let mut req = self.client.get(format!("{}{}", self.base_url, path));
        if let Some(t) = token {
            req = req.bearer_auth(t);
        }
        if let Some(ref key) = self.api_key {
            req = req.header("x-api-key", key);
        }
        req
    }

    async fn expect_success(res: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        if res.status().is_success() {
            return Ok(res);
        }
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        Err(BackendError::Api(format!("{} {}", status, body)))
    }
}

#[async_trait]
impl ChatBackend for ChatClient {
    async fn active_context(&self, token: Option<&str>) -> Result<String, BackendError> {
        let res = self.get("/get_contexto", token).send().await?;
        let res = Self::expect_success(res).await?;
        let data: ContextResponse = res.json().await?;
        data.contexto
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| BackendError::Api("missing contexto in response".to_string()))
    }

    async fn confirm_context(&self, name: &str, token: Option<&str>) -> Result<(), BackendError> {
        let res = self.get(&format!("/get_contexto/{}", name), token).send().await?;
        Self::expect_success(res).await?;
        Ok(())
    }

    async fn history(
        &self,
        session_id: &str,
        token: Option<&str>,
    ) -> Result<Vec<Message>, BackendError> {
        let res = self
            .get("/history", token)
            .header("x-session-id", session_id)
            .send()
            .await?;
        let res = Self::expect_success(res).await?;
        let data: HistoryResponse = res.json().await?;
        Ok(data.history)
    }

    async fn send(&self, message: &str, token: &str) -> Result<ChatReply, BackendError> {
        let mut req = self
            .client
            .post(format!("{}/chat", self.base_url))
            .bearer_auth(token)
            .json(&ChatRequest { message });
        if let Some(ref key) = self.api_key {
            req = req.header("x-api-key", key);
        }
        let res = req.send().await?;
        let res = Self::expect_success(res).await?;
        let data: ChatReply = res.json().await?;
        Ok(data)
    }

    async fn reset(&self) -> Result<(), BackendError> {
        let mut req = self.client.post(format!("{}/reset", self.base_url));
        if let Some(ref key) = self.api_key {
            req = req.header("x-api-key", key);
        }
        let res = req.send().await?;
        Self::expect_success(res).await?;
        Ok(())
    }
}
