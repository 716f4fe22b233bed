//! Best-effort fan-out of hub events to every registered connection.

use chathub_shared::{HubEvent, WsEnvelope};

use crate::registry::ConnectionRegistry;

#[derive(Clone)]
pub struct Broadcaster {
    registry: ConnectionRegistry,
}

impl Broadcaster {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }

    /// Deliver `event` to every connection present in the registry right now.
    ///
    /// Each recipient gets its own envelope. A failed delivery is logged and
    /// skipped; it never stops the remaining deliveries and is never reported
    /// to the caller. Returns how many deliveries were handed off.
    pub async fn publish(&self, event: HubEvent) -> usize {
        let recipients = self.registry.snapshot().await;
        let total = recipients.len();
        let mut delivered = 0;

        for recipient in recipients {
            match recipient.sink.deliver(WsEnvelope::new(event.clone())) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::debug!(connection = %recipient.id, "dropping {} event: {}", event.name(), e);
                }
            }
        }

        tracing::trace!("published {} to {}/{} connections", event.name(), delivered, total);
        delivered
    }
}
