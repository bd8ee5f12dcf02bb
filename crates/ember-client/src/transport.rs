//! Transport seam between the connection manager and the wire.
//!
//! Production code dials the relay over tokio-tungstenite; tests substitute
//! an in-memory implementation so the connection state machine can be driven
//! without a network.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::Message as WsMessage, MaybeTlsStream, WebSocketStream,
};

pub type TransportResult<T> = Result<T, TransportError>;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connect to {url} failed: {reason}")]
    Connect { url: String, reason: String },
    #[error("socket closed")]
    Closed,
}

/// One live socket. `recv` yields text frames until the peer closes or the
/// link drops; non-text frames are not chat frames and are skipped.
#[async_trait]
pub trait Socket: Send {
    async fn send(&mut self, text: String) -> TransportResult<()>;
    async fn recv(&mut self) -> Option<String>;
    async fn close(&mut self);
}

/// Socket factory. Exactly one socket per successful `connect` call; the
/// connection manager guarantees it never holds two at once.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn connect(&self, url: &str) -> TransportResult<Box<dyn Socket>>;
}

/// tokio-tungstenite transport used outside of tests.
pub struct WsTransport;

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self, url: &str) -> TransportResult<Box<dyn Socket>> {
        let (stream, _) = connect_async(url)
            .await
            .map_err(|e| TransportError::Connect {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Box::new(WsSocket { inner: stream }))
    }
}

struct WsSocket {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Socket for WsSocket {
    async fn send(&mut self, text: String) -> TransportResult<()> {
        self.inner
            .send(WsMessage::Text(text.into()))
            .await
            .map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self) -> Option<String> {
        while let Some(frame) = self.inner.next().await {
            match frame {
                Ok(WsMessage::Text(text)) => return Some(text.to_string()),
                Ok(WsMessage::Close(_)) | Err(_) => return None,
                // Ping/pong are answered by tungstenite; binary frames are
                // not part of the chat protocol.
                Ok(_) => continue,
            }
        }
        None
    }

    async fn close(&mut self) {
        let _ = self.inner.close(None).await;
    }
}
