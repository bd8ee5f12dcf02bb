pub mod chat;
pub mod ws;

pub use chat::{bridge_message, get_messages, send_message};
pub use ws::chat_ws;
