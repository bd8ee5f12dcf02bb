//! Client core for the Embercraft live chat.
//!
//! The pipeline: [`conn::Connection`] owns the single WebSocket link to the
//! relay and its fixed-delay reconnect loop; inbound frames fan out through
//! [`dispatch::HandlerRegistry`] to whatever views are mounted; each view
//! feeds its own [`feed::ChatFeed`] window. Writes go the other way, over
//! REST via [`api::ChatApi`]; the sent message comes back through the
//! broadcast path, never as a synchronous response.

pub mod api;
pub mod conn;
pub mod dispatch;
pub mod feed;
pub mod session;
pub mod transport;

pub use api::{ApiError, ChatApi, SendError};
pub use conn::{Connection, ConnectionConfig, ConnectionState};
pub use dispatch::{HandlerGuard, HandlerRegistry};
pub use feed::{ChatFeed, Clock, ScrollCue, SystemClock};
pub use session::{handle_send_failure, MemoryTokenStore, SendFailure, TokenStore};
pub use transport::{Socket, Transport, TransportError, TransportResult, WsTransport};

pub use ember_common::ChatMessage;
