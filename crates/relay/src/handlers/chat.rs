//! REST chat endpoints: history, website send, bridge ingest.

use crate::{
    auth::AuthError,
    config::AppState,
    error::ApiError,
    store::NewMessage,
};
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use ember_common::{Attachment, ChatMessage, Embed};
use serde::Deserialize;
use tracing::info;

/// Matches the bridged platform's message length cap.
const MAX_MESSAGE_LEN: usize = 2000;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct BridgeRequest {
    pub author_name: String,
    #[serde(default)]
    pub author_avatar: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub embeds: Vec<Embed>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// The bridged platform's own id for this message; clients use it for
    /// cross-matching dedup.
    #[serde(default)]
    pub upstream_id: Option<String>,
}

/// GET /chat/messages?limit=N
///
/// Most recent N persisted messages, newest-last. Public: this backs the
/// site's chat widget before login.
pub async fn get_messages(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(state.config.history_limit)
        .min(state.config.history_limit_max);
    info!("GET /chat/messages limit={}", limit);

    let messages = state.store.recent(limit).await?;
    Ok(Json(messages))
}

/// POST /chat/send
///
/// Persists the caller's message and broadcasts it. The response carries no
/// payload: the message reaches the sender over the push channel like
/// everyone else, in relay order.
pub async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SendRequest>,
) -> Result<StatusCode, ApiError> {
    let token = bearer_token(&headers).ok_or(ApiError::Unauthorized)?;
    let user = state.auth.resolve_bearer(token).await.map_err(|e| match e {
        AuthError::UserNotFound => ApiError::UserNotFound,
        AuthError::InvalidSession => ApiError::Unauthorized,
        AuthError::Db(e) => ApiError::Internal(e.to_string()),
    })?;

    let content = req.message.trim();
    if content.is_empty() {
        return Err(ApiError::BadRequest("Message is empty".to_string()));
    }
    if content.len() > MAX_MESSAGE_LEN {
        return Err(ApiError::BadRequest("Message is too long".to_string()));
    }

    let message = state
        .store
        .append(NewMessage {
            author_name: user.username.clone(),
            author_avatar: user.avatar,
            content: Some(content.to_string()),
            ..Default::default()
        })
        .await?;

    state.hub.publish(message);
    info!("[Chat] {} sent a message", user.username);

    Ok(StatusCode::NO_CONTENT)
}

/// POST /bridge/message
///
/// Ingest for the bridge process relaying the community's Discord channel.
/// Authenticated by shared secret, not by user session.
pub async fn bridge_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<BridgeRequest>,
) -> Result<StatusCode, ApiError> {
    let expected = state
        .config
        .bridge_token
        .as_deref()
        .ok_or(ApiError::Unauthorized)?;
    let provided = headers
        .get("x-bridge-token")
        .and_then(|v| v.to_str().ok());
    if provided != Some(expected) {
        return Err(ApiError::Unauthorized);
    }

    if req.content.is_none() && req.embeds.is_empty() && req.attachments.is_empty() {
        return Err(ApiError::BadRequest("Message has no content".to_string()));
    }

    let message = state
        .store
        .append(NewMessage {
            author_name: req.author_name,
            author_avatar: req.author_avatar,
            content: req.content,
            embeds: req.embeds,
            attachments: req.attachments,
            upstream_id: req.upstream_id,
        })
        .await?;

    info!("[Bridge] relayed message from {}", message.author_name);
    state.hub.publish(message);

    Ok(StatusCode::NO_CONTENT)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_requires_the_scheme_prefix() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer abc123".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc123"));

        headers.insert(header::AUTHORIZATION, "abc123".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }
}
