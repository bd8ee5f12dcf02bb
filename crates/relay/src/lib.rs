//! Embercraft Chat Relay
//!
//! The server side of the community's live chat: persists messages from
//! website users and the Discord bridge in SQLite, and pushes every new
//! message to all connected WebSocket clients. Reads and writes are REST,
//! delivery is push: the relay is the single ordering authority.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod hub;
pub mod store;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use auth::AuthManager;
use config::{AppState, RelayConfig};
use handlers::{bridge_message, chat_ws, get_messages, send_message};
use hub::ChatHub;
use store::MessageStore;

/// Build the shared state: open the database, wire the managers.
pub async fn build_state(config: RelayConfig) -> anyhow::Result<AppState> {
    if let Some(parent) = config.db_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let store = Arc::new(MessageStore::new(&config.db_path).await?);
    let auth = Arc::new(AuthManager::new(store.pool().clone()));
    let hub = ChatHub::new(config.channel_capacity);

    Ok(AppState {
        store,
        auth,
        hub,
        config: Arc::new(config),
    })
}

/// Build the router with all chat routes and middleware layers.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/chat/messages", get(get_messages))
        .route("/chat/send", post(send_message))
        .route("/chat/ws", get(chat_ws))
        .route("/bridge/message", post(bridge_message))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

pub async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        // Already set, ignore
    }

    let config = RelayConfig::from_env();
    info!("=== Embercraft Chat Relay ===");
    info!("Database: {:?}", config.db_path);
    info!(
        "Bridge ingest: {}",
        if config.bridge_token.is_some() {
            "enabled"
        } else {
            "disabled (set CHAT_BRIDGE_TOKEN)"
        }
    );

    let bind_addr = config.bind_addr;
    let state = build_state(config).await?;
    let app = router(state);

    info!("Listening on http://{}", bind_addr);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK - Embercraft Chat Relay"
}
