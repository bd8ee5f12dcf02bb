//! Relay configuration and shared state.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use crate::auth::AuthManager;
use crate::hub::ChatHub;
use crate::store::MessageStore;

/// Configuration for the chat relay
#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Address to serve on
    pub bind_addr: SocketAddr,
    /// SQLite database file
    pub db_path: PathBuf,
    /// Shared secret the bridge process presents on /bridge/message.
    /// With no secret configured, bridge ingest is disabled.
    pub bridge_token: Option<String>,
    /// Default history window handed to a freshly connected client
    pub history_limit: usize,
    /// Hard cap on ?limit=
    pub history_limit_max: usize,
    /// Broadcast channel capacity; slow sockets past this lag and skip
    pub channel_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3002)),
            db_path: PathBuf::from("ember_data").join("chat.sqlite"),
            bridge_token: None,
            history_limit: 20,
            history_limit_max: 100,
            channel_capacity: 256,
        }
    }
}

impl RelayConfig {
    /// Read configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(addr) = std::env::var("CHAT_BIND") {
            match addr.parse() {
                Ok(addr) => config.bind_addr = addr,
                Err(_) => tracing::warn!("Ignoring unparseable CHAT_BIND {:?}", addr),
            }
        }
        if let Ok(path) = std::env::var("CHAT_DB") {
            config.db_path = PathBuf::from(path);
        }
        if let Ok(token) = std::env::var("CHAT_BRIDGE_TOKEN") {
            if !token.is_empty() {
                config.bridge_token = Some(token);
            }
        }
        config
    }

    /// Config rooted at a custom directory (used by tests).
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            db_path: base_dir.into().join("chat.sqlite"),
            ..Self::default()
        }
    }
}

/// App state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MessageStore>,
    pub auth: Arc<AuthManager>,
    pub hub: ChatHub,
    pub config: Arc<RelayConfig>,
}
