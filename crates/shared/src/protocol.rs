//! Hub protocol constants and frame codec helpers.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::models::WsEnvelope;

/// Well-known path the hub is mounted on.
pub const DEFAULT_HUB_PATH: &str = "/chatHub";

/// Serialize an envelope into a text frame.
pub fn encode<T: Serialize>(envelope: &WsEnvelope<T>) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(envelope)?)
}

/// Decode a text frame into an envelope.
pub fn decode<T: DeserializeOwned>(text: &str) -> Result<WsEnvelope<T>, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

#[derive(Deserialize)]
struct IdOnly {
    id: String,
}

/// Best-effort extraction of the envelope id from a frame whose payload did
/// not decode, so the failure can still be correlated.
pub fn peek_id(text: &str) -> Option<String> {
    serde_json::from_str::<IdOnly>(text).ok().map(|f| f.id)
}
