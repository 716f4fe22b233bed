//! Hub connection driver: connect, pump frames, reconnect with backoff.

use std::sync::Arc;
use std::time::Duration;

use chathub_shared::{decode, HubEvent};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;

use super::connection::{ConnectionState, HubHandle, ReconnectConfig, Shared};

/// Why a live session ended.
enum SessionEnd {
    Dropped,
    Cancelled,
}

/// A managed connection to one hub.
///
/// The driver task connects once on start and reconnects on failure or on
/// an unexpected drop, following the [`ReconnectConfig`] backoff.
pub struct HubConnection {
    shared: Arc<Shared>,
    state: watch::Receiver<ConnectionState>,
    events: Option<mpsc::UnboundedReceiver<HubEvent>>,
    invoke_timeout: Duration,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl HubConnection {
    /// Start the connection loop in a background tokio task.
    pub fn start(url: impl Into<String>, reconnect: ReconnectConfig, invoke_timeout: Duration) -> Self {
        let url = url.into();
        let shared = Arc::new(Shared::default());
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let task = tokio::spawn(connection_loop(
            url,
            shared.clone(),
            state_tx,
            events_tx,
            reconnect,
            cancel.clone(),
        ));

        Self {
            shared,
            state: state_rx,
            events: Some(events_rx),
            invoke_timeout,
            cancel,
            task,
        }
    }

    /// Get a handle for invoking hub operations
    pub fn handle(&self) -> HubHandle {
        HubHandle::new(self.shared.clone(), self.invoke_timeout)
    }

    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Receiver of connection state changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Take the stream of broadcast events. Only the first call gets it.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<HubEvent>> {
        self.events.take()
    }

    /// Wait until the connection reaches a state matching `pred`.
    pub async fn wait_for_state(&self, pred: impl FnMut(&ConnectionState) -> bool) -> ConnectionState {
        let mut state = self.state.clone();
        let result = match state.wait_for(pred).await {
            Ok(s) => s.clone(),
            // Driver gone; report whatever it left behind.
            Err(_) => self.state(),
        };
        result
    }

    /// Close the socket and stop reconnecting.
    pub async fn close(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::error!("connection task ended abnormally: {}", e);
        }
    }
}

async fn connection_loop(
    url: String,
    shared: Arc<Shared>,
    state: watch::Sender<ConnectionState>,
    events: mpsc::UnboundedSender<HubEvent>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
) {
    let mut attempt = 0u32;

    loop {
        if attempt == 0 {
            state.send_replace(ConnectionState::Connecting);
        } else {
            if !reconnect.allows(attempt) {
                state.send_replace(ConnectionState::Failed {
                    reason: format!(
                        "Max reconnect attempts ({}) exceeded",
                        reconnect.max_attempts
                    ),
                });
                break;
            }

            state.send_replace(ConnectionState::Reconnecting { attempt });
            let delay = reconnect.delay_for_attempt(attempt);
            tracing::info!("Reconnecting to {} in {:?} (attempt {})", url, delay, attempt);
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        let connected = tokio::select! {
            _ = cancel.cancelled() => break,
            result = connect_async(url.as_str()) => result,
        };

        match connected {
            Ok((ws_stream, _response)) => {
                tracing::info!("Connected to hub at {}", url);
                let (out_tx, out_rx) = mpsc::unbounded_channel();
                *shared.writer.lock().await = Some(out_tx);
                state.send_replace(ConnectionState::Connected);

                let end = run_session(ws_stream, out_rx, &shared, &events, &cancel).await;

                shared.detach().await;
                state.send_replace(ConnectionState::Disconnected);
                match end {
                    SessionEnd::Cancelled => return,
                    SessionEnd::Dropped => {
                        tracing::warn!("Connection to {} lost", url);
                        attempt = 1;
                    }
                }
            }
            Err(e) => {
                tracing::error!("Failed to connect to {}: {}", url, e);
                attempt = attempt.saturating_add(1);
            }
        }
    }

    shared.detach().await;
    if !matches!(*state.borrow(), ConnectionState::Failed { .. }) {
        state.send_replace(ConnectionState::Disconnected);
    }
}

/// Pump one live socket until it closes or the connection is cancelled.
async fn run_session<S>(
    ws_stream: tokio_tungstenite::WebSocketStream<S>,
    mut outbound: mpsc::UnboundedReceiver<String>,
    shared: &Shared,
    events: &mpsc::UnboundedSender<HubEvent>,
    cancel: &CancellationToken,
) -> SessionEnd
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = write.send(Message::Close(None)).await;
                return SessionEnd::Cancelled;
            }
            frame = outbound.recv() => {
                let Some(json) = frame else {
                    return SessionEnd::Dropped;
                };
                tracing::debug!("Sending: {}", json);
                if let Err(e) = write.send(Message::Text(json.into())).await {
                    tracing::error!("Send failed: {}", e);
                    return SessionEnd::Dropped;
                }
            }
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => handle_frame(text.as_str(), shared, events).await,
                Some(Ok(Message::Close(_))) | None => return SessionEnd::Dropped,
                Some(Ok(_)) => {
                    // Pong is handled automatically by tungstenite
                }
                Some(Err(e)) => {
                    tracing::error!("WebSocket read error: {}", e);
                    return SessionEnd::Dropped;
                }
            },
        }
    }
}

async fn handle_frame(text: &str, shared: &Shared, events: &mpsc::UnboundedSender<HubEvent>) {
    let envelope = match decode::<HubEvent>(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::error!("Failed to parse frame: {}", e);
            return;
        }
    };

    if envelope.payload.is_broadcast() {
        // Nobody listening is fine; the events are ephemeral.
        let _ = events.send(envelope.payload);
        return;
    }

    match envelope.correlation_id {
        Some(id) => {
            if !shared.resolve(&id, envelope.payload).await {
                tracing::debug!("Completion for unknown invocation {}", id);
            }
        }
        None => tracing::warn!("Completion without correlation id"),
    }
}
