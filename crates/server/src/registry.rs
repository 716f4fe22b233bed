//! Connection registry: live connections and their optional display names.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chathub_shared::{HubEvent, WsEnvelope};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// Server-assigned id for one live transport session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Why a single delivery did not go through.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("connection closed")]
    Closed,

    #[error("outbound queue full")]
    Full,

    #[error("transport error: {0}")]
    Transport(String),
}

/// Outbound side of one connection.
///
/// Implementations must not block: the hub calls `deliver` while fanning out
/// to every connection. Order of successful deliveries must be preserved.
pub trait EventSink: Send + Sync {
    fn deliver(&self, envelope: WsEnvelope<HubEvent>) -> Result<(), DeliveryError>;
}

impl EventSink for mpsc::Sender<WsEnvelope<HubEvent>> {
    fn deliver(&self, envelope: WsEnvelope<HubEvent>) -> Result<(), DeliveryError> {
        self.try_send(envelope).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

pub type SharedSink = Arc<dyn EventSink>;

struct Session {
    name: Option<String>,
    sink: SharedSink,
}

/// A connection captured by [`ConnectionRegistry::snapshot`].
#[derive(Clone)]
pub struct Recipient {
    pub id: ConnectionId,
    pub sink: SharedSink,
}

/// Concurrency-safe map of connection -> session. Cheap to clone; clones
/// share the same map.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    sessions: Arc<RwLock<HashMap<ConnectionId, Session>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an anonymous session. Registering the same id twice replaces the
    /// earlier entry.
    pub async fn register(&self, id: ConnectionId, sink: SharedSink) {
        let mut sessions = self.sessions.write().await;
        if sessions.insert(id, Session { name: None, sink }).is_some() {
            tracing::warn!(connection = %id, "connection registered twice, replacing entry");
        }
    }

    /// Set the display name of a registered connection. Returns `false` when
    /// the connection is unknown.
    pub async fn set_name(&self, id: ConnectionId, name: impl Into<String>) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&id) {
            Some(session) => {
                session.name = Some(name.into());
                true
            }
            None => {
                tracing::warn!(connection = %id, "set_name on unregistered connection");
                false
            }
        }
    }

    /// Remove a connection, returning the name it had, if any.
    pub async fn unregister(&self, id: ConnectionId) -> Option<String> {
        self.sessions
            .write()
            .await
            .remove(&id)
            .and_then(|session| session.name)
    }

    /// Point-in-time copy of all recipients. The lock is released before
    /// this returns.
    pub async fn snapshot(&self) -> Vec<Recipient> {
        self.sessions
            .read()
            .await
            .iter()
            .map(|(id, session)| Recipient {
                id: *id,
                sink: session.sink.clone(),
            })
            .collect()
    }

    pub async fn name_of(&self, id: ConnectionId) -> Option<String> {
        self.sessions
            .read()
            .await
            .get(&id)
            .and_then(|session| session.name.clone())
    }

    pub async fn contains(&self, id: ConnectionId) -> bool {
        self.sessions.read().await.contains_key(&id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
