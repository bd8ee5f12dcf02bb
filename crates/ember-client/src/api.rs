//! REST access to the relay: history fetch and the authenticated send path.
//!
//! Sending is deliberately asymmetric: a successful send returns no message
//! payload; the created message arrives back through the broadcast path so
//! every viewer, sender included, sees the relay's ordering.

use ember_common::{ChatMessage, USER_NOT_FOUND_CODE};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("relay rejected request: {0}")]
    Rejected(String),
}

/// Send-path failures. `StaleIdentity` is load-bearing: the UI clears local
/// credentials and routes to login, instead of showing a transient alert.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("account no longer exists")]
    StaleIdentity,
    #[error("relay rejected message: {0}")]
    Rejected(String),
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    code: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendBody<'a> {
    message: &'a str,
}

/// HTTP client for the relay's REST surface.
pub struct ChatApi {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ChatApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    /// GET /chat/messages?limit=N: most recent N messages, newest-last.
    pub async fn recent_messages(&self, limit: usize) -> Result<Vec<ChatMessage>, ApiError> {
        let url = format!("{}/chat/messages?limit={}", self.base_url, limit);
        let resp = self.http.get(&url).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            warn!("[ChatApi] history fetch failed: {}", status);
            return Err(ApiError::Rejected(format!("status {status}")));
        }
        Ok(resp.json().await?)
    }

    /// POST /chat/send. Success carries no payload; the message comes back
    /// over the push channel.
    pub async fn send_message(&self, content: &str) -> Result<(), SendError> {
        let url = format!("{}/chat/send", self.base_url);
        let mut req = self.http.post(&url).json(&SendBody { message: content });
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await?;
        if resp.status().is_success() {
            return Ok(());
        }

        let status = resp.status();
        let body = resp.json::<ErrorBody>().await.ok();
        if let Some(body) = &body {
            if body.code.as_deref() == Some(USER_NOT_FOUND_CODE) {
                return Err(SendError::StaleIdentity);
            }
        }
        Err(SendError::Rejected(
            body.map(|b| b.error)
                .unwrap_or_else(|| format!("status {status}")),
        ))
    }
}
