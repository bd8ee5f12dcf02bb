//! Persistent connection to the relay.
//!
//! One owned object per process surface, passed in explicitly rather than a
//! module-level singleton, so the single-socket invariant is visible in the
//! type rather than implicit in import order. The manager runs a single
//! driver task: connect, pump frames, and on loss wait a fixed delay before
//! dialing again. There is no backoff and no retry cap; live chat is
//! best-effort delivery, with the REST history fetch absorbing gaps.

use crate::dispatch::{HandlerGuard, HandlerRegistry};
use crate::transport::{Socket, Transport, WsTransport};
use ember_common::ChatMessage;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Fixed pause between a lost connection and the next dial.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub url: String,
    pub reconnect_delay: Duration,
}

impl ConnectionConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
}

struct ConnInner {
    config: ConnectionConfig,
    transport: Arc<dyn Transport>,
    registry: HandlerRegistry,
    state_tx: watch::Sender<ConnectionState>,
    /// Present exactly while the socket is open; `send` goes through here.
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
}

impl ConnInner {
    fn set_state(&self, state: ConnectionState) {
        // send_replace: the value must move even with no watchers attached.
        self.state_tx.send_replace(state);
    }

    fn drop_outbound(&self) {
        *self.outbound.lock() = None;
    }
}

/// Owns the WebSocket link to the relay: at most one live socket and at most
/// one pending reconnect timer at any time.
pub struct Connection {
    inner: Arc<ConnInner>,
    driver: Mutex<Option<JoinHandle<()>>>,
    shutdown: Mutex<Option<watch::Sender<bool>>>,
}

impl Connection {
    pub fn new(config: ConnectionConfig, transport: Arc<dyn Transport>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(ConnInner {
                config,
                transport,
                registry: HandlerRegistry::new(),
                state_tx,
                outbound: Mutex::new(None),
            }),
            driver: Mutex::new(None),
            shutdown: Mutex::new(None),
        }
    }

    /// Production constructor: dial over tokio-tungstenite.
    pub fn ws(config: ConnectionConfig) -> Self {
        Self::new(config, Arc::new(WsTransport))
    }

    /// Start the driver task. Idempotent: a no-op while a connection is open
    /// or an attempt is in flight, so rapid mount/unmount in the UI layer
    /// cannot stack sockets.
    pub fn connect(&self) {
        let mut driver = self.driver.lock();
        if let Some(handle) = driver.as_ref() {
            if !handle.is_finished() {
                debug!("[Chat] connect() ignored, driver already running");
                return;
            }
        }
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        *self.shutdown.lock() = Some(shutdown_tx);
        let inner = self.inner.clone();
        *driver = Some(tokio::spawn(drive(inner, shutdown_rx)));
    }

    /// Cancel any pending reconnect timer and close the live socket. The
    /// manager is quiescent afterwards until the next `connect()`.
    pub fn disconnect(&self) {
        if let Some(tx) = self.shutdown.lock().take() {
            let _ = tx.send(true);
        }
        if let Some(handle) = self.driver.lock().take() {
            handle.abort();
        }
        self.inner.drop_outbound();
        self.inner.set_state(ConnectionState::Disconnected);
    }

    /// Register a handler for inbound messages. Dropping the guard removes
    /// it; an unmounting view must drop its guard or messages double-deliver
    /// on the next mount.
    pub fn on_message<F>(&self, handler: F) -> HandlerGuard
    where
        F: Fn(&ChatMessage) + Send + Sync + 'static,
    {
        self.inner.registry.register(handler)
    }

    /// Transmit a raw text payload if the connection is open right now.
    /// Returns false (and drops the payload) otherwise; callers that need
    /// delivery guarantees use the REST send path instead.
    pub fn send(&self, text: impl Into<String>) -> bool {
        let outbound = self.inner.outbound.lock();
        match outbound.as_ref() {
            Some(tx) => tx.send(text.into()).is_ok(),
            None => false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state_tx.borrow()
    }

    /// Observable state, e.g. for a "disconnected" indicator.
    pub fn status(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(handle) = self.driver.lock().take() {
            handle.abort();
        }
    }
}

/// The one driver task: dial, pump, sleep, repeat. Owning the loop in a
/// single task is what makes "one socket, one timer" hold by construction.
async fn drive(inner: Arc<ConnInner>, mut shutdown: watch::Receiver<bool>) {
    loop {
        inner.set_state(ConnectionState::Connecting);
        let attempt = tokio::select! {
            result = inner.transport.connect(&inner.config.url) => result,
            _ = shutdown.changed() => return,
        };

        match attempt {
            Ok(socket) => {
                info!("[Chat] connected to {}", inner.config.url);
                pump(&inner, socket, &mut shutdown).await;
                inner.drop_outbound();
                inner.set_state(ConnectionState::Disconnected);
                if *shutdown.borrow() {
                    return;
                }
                warn!(
                    "[Chat] connection lost, reconnecting in {:?}",
                    inner.config.reconnect_delay
                );
            }
            Err(e) => {
                inner.set_state(ConnectionState::Disconnected);
                warn!(
                    "[Chat] connect failed: {}, retrying in {:?}",
                    e, inner.config.reconnect_delay
                );
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(inner.config.reconnect_delay) => {}
            _ = shutdown.changed() => return,
        }
    }
}

/// Pump one socket until it closes or shutdown is requested.
async fn pump(
    inner: &Arc<ConnInner>,
    mut socket: Box<dyn Socket>,
    shutdown: &mut watch::Receiver<bool>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    *inner.outbound.lock() = Some(tx);
    inner.set_state(ConnectionState::Open);

    loop {
        tokio::select! {
            frame = socket.recv() => match frame {
                Some(text) => {
                    inner.registry.dispatch_text(&text);
                }
                None => return,
            },
            out = rx.recv() => match out {
                Some(text) => {
                    if socket.send(text).await.is_err() {
                        return;
                    }
                }
                None => return,
            },
            _ = shutdown.changed() => {
                socket.close().await;
                return;
            }
        }
    }
}
