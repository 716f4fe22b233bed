//! ChatHub client
//!
//! Session agent for the chat hub: a managed WebSocket connection with
//! automatic reconnect, name-gated sending, and a local transcript of
//! everything the hub pushes.

pub mod config;
pub mod error;
pub mod render;
pub mod session;
pub mod stores;
pub mod ws;

pub use config::ClientConfig;
pub use error::ClientError;
pub use session::ChatSession;
pub use stores::{ChatLine, Transcript};
pub use ws::{ConnectionState, HubConnection, HubHandle, ReconnectConfig};
