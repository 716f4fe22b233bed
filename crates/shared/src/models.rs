//! Wire models for the chat hub protocol.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::InvocationError;

// --- Envelope ---

/// One frame on the wire. The payload's `type`/`data` pair is flattened
/// next to the envelope fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WsEnvelope<T> {
    pub id: String,
    #[serde(flatten)]
    pub payload: T,
    pub ts: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl<T> WsEnvelope<T> {
    /// Wrap a payload in a fresh envelope with a new id.
    pub fn new(payload: T) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            payload,
            ts: Utc::now(),
            correlation_id: None,
        }
    }

    /// Wrap a payload as the answer to the frame with id `correlation_id`.
    pub fn reply_to(correlation_id: impl Into<String>, payload: T) -> Self {
        Self {
            correlation_id: Some(correlation_id.into()),
            ..Self::new(payload)
        }
    }
}

// --- Client -> Hub ---

/// Operations a client can invoke on the hub.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data")]
pub enum HubInvocation {
    SetUserName {
        name: String,
    },
    /// `user` is whatever label the caller supplies; the hub does not check
    /// it against the caller's registered name.
    SendMessage {
        user: String,
        message: String,
    },
}

impl HubInvocation {
    pub fn name(&self) -> &'static str {
        match self {
            HubInvocation::SetUserName { .. } => "SetUserName",
            HubInvocation::SendMessage { .. } => "SendMessage",
        }
    }
}

// --- Hub -> Client ---

pub const EVENT_RECEIVE_MESSAGE: &str = "ReceiveMessage";
pub const EVENT_SYSTEM_MESSAGE: &str = "SystemMessage";
pub const EVENT_COMPLETION: &str = "Completion";

/// Events pushed by the hub.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data")]
pub enum HubEvent {
    ReceiveMessage {
        user: String,
        message: String,
    },
    SystemMessage {
        text: String,
    },
    /// Acknowledges a single invocation. Only ever sent to the caller, with
    /// the envelope's `correlation_id` set to the invocation id.
    Completion {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<InvocationError>,
    },
}

impl HubEvent {
    pub fn system(text: impl Into<String>) -> Self {
        HubEvent::SystemMessage { text: text.into() }
    }

    pub fn message(user: impl Into<String>, message: impl Into<String>) -> Self {
        HubEvent::ReceiveMessage {
            user: user.into(),
            message: message.into(),
        }
    }

    pub fn completed() -> Self {
        HubEvent::Completion { error: None }
    }

    pub fn failed(error: InvocationError) -> Self {
        HubEvent::Completion { error: Some(error) }
    }

    /// Event tag as seen by clients.
    pub fn name(&self) -> &'static str {
        match self {
            HubEvent::ReceiveMessage { .. } => EVENT_RECEIVE_MESSAGE,
            HubEvent::SystemMessage { .. } => EVENT_SYSTEM_MESSAGE,
            HubEvent::Completion { .. } => EVENT_COMPLETION,
        }
    }

    /// Ordered string arguments of the event.
    pub fn args(&self) -> Vec<String> {
        match self {
            HubEvent::ReceiveMessage { user, message } => vec![user.clone(), message.clone()],
            HubEvent::SystemMessage { text } => vec![text.clone()],
            HubEvent::Completion { error } => error
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }

    /// Whether this event is part of the broadcast stream (as opposed to a
    /// per-caller acknowledgement).
    pub fn is_broadcast(&self) -> bool {
        !matches!(self, HubEvent::Completion { .. })
    }
}
