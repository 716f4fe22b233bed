//! Connection state, reconnect policy, and the handle used to invoke hub
//! operations.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chathub_shared::{encode, HubEvent, HubInvocation, WsEnvelope};
use tokio::sync::{mpsc, oneshot, Mutex};

use crate::error::ClientError;

/// Connection state for the hub connection
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    Failed { reason: String },
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

/// Configuration for auto-reconnect behavior
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Maximum number of reconnect attempts (0 = infinite)
    pub max_attempts: u32,
    /// Initial delay in milliseconds
    pub initial_delay_ms: u64,
    /// Maximum delay in milliseconds
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay_ms: 1000,
            max_delay_ms: 30000,
            backoff_multiplier: 1.5,
        }
    }
}

impl ReconnectConfig {
    /// Delay before reconnect attempt `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        let ms = if delay.is_finite() {
            (delay as u64).min(self.max_delay_ms)
        } else {
            self.max_delay_ms
        };
        Duration::from_millis(ms)
    }

    /// Whether another attempt is allowed after `attempt` attempts.
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts == 0 || attempt <= self.max_attempts
    }
}

/// State shared between handles and the connection driver.
#[derive(Default)]
pub(crate) struct Shared {
    /// Outbound frame queue of the live socket; `None` while disconnected.
    pub(crate) writer: Mutex<Option<mpsc::UnboundedSender<String>>>,
    /// Invocations waiting for their `Completion`, keyed by envelope id.
    pub(crate) pending: Mutex<HashMap<String, oneshot::Sender<HubEvent>>>,
}

impl Shared {
    /// Route a completion to its waiting invocation. Returns `false` if no
    /// one is waiting for it.
    pub(crate) async fn resolve(&self, correlation_id: &str, completion: HubEvent) -> bool {
        match self.pending.lock().await.remove(correlation_id) {
            Some(tx) => tx.send(completion).is_ok(),
            None => false,
        }
    }

    /// Drop the live writer and fail every in-flight invocation.
    pub(crate) async fn detach(&self) {
        *self.writer.lock().await = None;
        self.pending.lock().await.clear();
    }
}

/// Handle for invoking hub operations. Cheap to clone.
#[derive(Clone)]
pub struct HubHandle {
    shared: Arc<Shared>,
    invoke_timeout: Duration,
}

impl HubHandle {
    pub(crate) fn new(shared: Arc<Shared>, invoke_timeout: Duration) -> Self {
        Self {
            shared,
            invoke_timeout,
        }
    }

    /// Invoke an operation and wait until the hub acknowledges it.
    ///
    /// This returns once the hub has executed the call, not once other
    /// clients have received the resulting broadcast.
    pub async fn invoke(&self, invocation: HubInvocation) -> Result<(), ClientError> {
        let envelope = WsEnvelope::new(invocation);
        let json = encode(&envelope)?;
        let id = envelope.id;

        let (tx, rx) = oneshot::channel();
        {
            let writer = self.shared.writer.lock().await;
            let Some(writer) = writer.as_ref() else {
                return Err(ClientError::NotConnected);
            };
            self.shared.pending.lock().await.insert(id.clone(), tx);
            if writer.send(json).is_err() {
                self.shared.pending.lock().await.remove(&id);
                return Err(ClientError::NotConnected);
            }
        }

        let result = tokio::time::timeout(self.invoke_timeout, rx).await;

        // Clean up pending entry on any exit path.
        self.shared.pending.lock().await.remove(&id);

        match result {
            Ok(Ok(HubEvent::Completion { error: None })) => Ok(()),
            Ok(Ok(HubEvent::Completion { error: Some(e) })) => Err(ClientError::Rejected(e)),
            Ok(Ok(other)) => Err(ClientError::UnexpectedReply(other.name())),
            Ok(Err(_)) => Err(ClientError::ConnectionLost),
            Err(_) => Err(ClientError::Timeout),
        }
    }

    pub async fn set_user_name(&self, name: &str) -> Result<(), ClientError> {
        self.invoke(HubInvocation::SetUserName {
            name: name.to_string(),
        })
        .await
    }

    pub async fn send_message(&self, user: &str, message: &str) -> Result<(), ClientError> {
        self.invoke(HubInvocation::SendMessage {
            user: user.to_string(),
            message: message.to_string(),
        })
        .await
    }
}
