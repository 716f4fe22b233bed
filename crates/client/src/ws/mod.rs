//! WebSocket connection to the chat hub.
//!
//! This module provides:
//! - Connection management with auto-reconnect ([`HubConnection`])
//! - Invocation of hub operations that resolve on the hub's acknowledgement
//!   ([`HubHandle`])
//!
//! # Architecture
//!
//! ```text
//!        ┌──────────────────────────────┐
//!        │         HubConnection        │
//!        │  (driver task, reconnects)   │
//!        └──────────────────────────────┘
//!           │ frames out        ▲ frames in
//!           ▼                   │
//!   ┌──────────────┐    ┌───────────────────┐
//!   │  HubHandle   │◄───│ completions by id │
//!   │  (invoke)    │    └───────────────────┘
//!   └──────────────┘            │ broadcast events
//!                               ▼
//!                      ┌──────────────────┐
//!                      │   ChatSession    │
//!                      │   (transcript)   │
//!                      └──────────────────┘
//! ```

mod connection;
mod driver;

pub use connection::{ConnectionState, HubHandle, ReconnectConfig};
pub use driver::HubConnection;
