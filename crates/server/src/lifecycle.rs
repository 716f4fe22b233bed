//! Connection lifecycle: registry bookkeeping on connect and disconnect.

use chathub_shared::HubEvent;

use crate::broadcast::Broadcaster;
use crate::handler::left_text;
use crate::registry::{ConnectionId, ConnectionRegistry, SharedSink};

/// Per-connection state. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Connecting,
    Open,
    Closed,
}

impl ConnectionPhase {
    /// Next phase after the transport reports progress. Stays `Closed` once
    /// closed.
    pub fn advance(self) -> Self {
        match self {
            ConnectionPhase::Connecting => ConnectionPhase::Open,
            ConnectionPhase::Open | ConnectionPhase::Closed => ConnectionPhase::Closed,
        }
    }
}

#[derive(Clone)]
pub struct LifecycleManager {
    registry: ConnectionRegistry,
    broadcaster: Broadcaster,
}

impl LifecycleManager {
    pub fn new(registry: ConnectionRegistry, broadcaster: Broadcaster) -> Self {
        Self {
            registry,
            broadcaster,
        }
    }

    /// Connecting -> Open. The new session is anonymous, so nothing is
    /// announced.
    pub async fn connect(&self, sink: SharedSink) -> ConnectionId {
        let id = ConnectionId::new();
        self.registry.register(id, sink).await;
        tracing::debug!(connection = %id, "connection open");
        id
    }

    /// Open -> Closed. Announces the departure only if the session had a
    /// name. The reason is informational.
    pub async fn disconnect(&self, id: ConnectionId, reason: Option<String>) {
        let name = self.registry.unregister(id).await;
        match &reason {
            Some(reason) => tracing::info!(connection = %id, "connection closed: {}", reason),
            None => tracing::debug!(connection = %id, "connection closed"),
        }

        if let Some(name) = name {
            self.broadcaster.publish(HubEvent::system(left_text(&name))).await;
        }
    }
}
