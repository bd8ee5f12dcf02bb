//! Broadcast fan-out of new messages to connected sockets.

use ember_common::ChatMessage;
use tokio::sync::broadcast;
use tracing::debug;

/// One channel for the whole relay; every WebSocket subscribes to it. A
/// receiver that falls behind the channel capacity lags and skips; the
/// client's dedup plus the REST history path absorb the gap.
#[derive(Clone)]
pub struct ChatHub {
    tx: broadcast::Sender<ChatMessage>,
}

impl ChatHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatMessage> {
        self.tx.subscribe()
    }

    /// Push one message to every connected socket; returns how many
    /// subscribers received it.
    pub fn publish(&self, message: ChatMessage) -> usize {
        match self.tx.send(message) {
            Ok(subscriber_count) => {
                debug!("[Hub] message fanned out to {} subscribers", subscriber_count);
                subscriber_count
            }
            Err(_) => {
                debug!("[Hub] no subscribers connected");
                0
            }
        }
    }
}
