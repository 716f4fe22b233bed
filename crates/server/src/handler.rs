//! Session protocol handler: executes client invocations.

use chathub_shared::{HubEvent, HubInvocation};

use crate::broadcast::Broadcaster;
use crate::registry::{ConnectionId, ConnectionRegistry};

pub fn joined_text(name: &str) -> String {
    format!("{} has joined the chat", name)
}

pub fn left_text(name: &str) -> String {
    format!("{} has left the chat", name)
}

#[derive(Clone)]
pub struct ChatHub {
    registry: ConnectionRegistry,
    broadcaster: Broadcaster,
}

impl ChatHub {
    pub fn new(registry: ConnectionRegistry, broadcaster: Broadcaster) -> Self {
        Self {
            registry,
            broadcaster,
        }
    }

    /// Route a decoded invocation and return the completion for the caller.
    pub async fn dispatch(&self, caller: ConnectionId, invocation: HubInvocation) -> HubEvent {
        tracing::debug!(connection = %caller, "invoking {}", invocation.name());
        match invocation {
            HubInvocation::SetUserName { name } => self.set_user_name(caller, name).await,
            HubInvocation::SendMessage { user, message } => {
                self.send_message(caller, user, message).await
            }
        }
        HubEvent::completed()
    }

    /// Name the caller's session and announce the join to everyone.
    ///
    /// Names are taken as given: empty and duplicate names are accepted.
    pub async fn set_user_name(&self, caller: ConnectionId, name: String) {
        if !self.registry.set_name(caller, name.as_str()).await {
            tracing::warn!(connection = %caller, "name {:?} not stored, connection is gone", name);
        }
        tracing::info!(connection = %caller, "{} joined", name);
        self.broadcaster.publish(HubEvent::system(joined_text(&name))).await;
    }

    /// Relay a chat message to everyone, the caller included.
    ///
    /// `user` is the caller-supplied label and is deliberately not checked
    /// against the name stored for `caller`.
    pub async fn send_message(&self, caller: ConnectionId, user: String, message: String) {
        tracing::debug!(connection = %caller, "message from {:?}", user);
        self.broadcaster
            .publish(HubEvent::ReceiveMessage { user, message })
            .await;
    }
}
