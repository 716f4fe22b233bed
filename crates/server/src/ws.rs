//! WebSocket transport for the hub.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use chathub_shared::{
    decode, encode, peek_id, HubEvent, HubInvocation, InvocationError, WsEnvelope,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::lifecycle::ConnectionPhase;
use crate::registry::ConnectionId;
use crate::state::AppState;

type Outbound = mpsc::Sender<WsEnvelope<HubEvent>>;

/// Frames buffered per connection before deliveries to it start failing.
const OUTBOUND_CAPACITY: usize = 256;

/// How long a closing connection gets to flush what is still queued.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// WebSocket upgrade handler
pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one hub connection until the transport closes.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut phase = ConnectionPhase::Connecting;

    // One queue per connection keeps delivery FIFO. Publishers never wait on
    // it: a full queue fails that one delivery.
    let (forward_tx, mut forward_rx) = mpsc::channel::<WsEnvelope<HubEvent>>(OUTBOUND_CAPACITY);
    let conn_id = state.lifecycle.connect(Arc::new(forward_tx.clone())).await;
    phase = phase.advance();
    tracing::info!(connection = %conn_id, ?phase, "WebSocket connection opened");

    // Task to forward events to the WebSocket
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = forward_rx.recv().await {
            let json = match encode(&event) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!("Failed to encode {} event: {}", event.payload.name(), e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
        // Flush anything still buffered, including a reply to the peer's close.
        let _ = sender.close().await;
    });

    // Main receive loop
    let mut reason = None;
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                handle_frame(&state, conn_id, text.as_str(), &forward_tx).await;
            }
            Ok(Message::Binary(_)) => {
                tracing::warn!(connection = %conn_id, "ignoring binary frame");
            }
            Ok(Message::Close(frame)) => {
                reason = frame.map(|f| format!("close code {}: {}", f.code, f.reason.as_str()));
                break;
            }
            Err(e) => {
                reason = Some(e.to_string());
                break;
            }
            _ => {}
        }
    }

    // Cleanup. Unregistering drops the registry's sender; once ours is gone
    // too the writer drains the queue and exits.
    phase = phase.advance();
    state.lifecycle.disconnect(conn_id, reason).await;
    drop(forward_tx);
    if tokio::time::timeout(DRAIN_TIMEOUT, &mut send_task).await.is_err() {
        tracing::warn!(connection = %conn_id, "writer did not drain in time");
        send_task.abort();
    }
    tracing::info!(connection = %conn_id, ?phase, "WebSocket connection closed");
}

/// Decode and dispatch one text frame, then acknowledge it to the caller.
async fn handle_frame(state: &AppState, caller: ConnectionId, text: &str, reply: &Outbound) {
    let completion = match decode::<HubInvocation>(text) {
        Ok(envelope) => {
            let completion = state.hub.dispatch(caller, envelope.payload).await;
            Some(WsEnvelope::reply_to(envelope.id, completion))
        }
        Err(e) => {
            tracing::warn!(connection = %caller, "rejecting frame: {}", e);
            peek_id(text).map(|id| {
                WsEnvelope::reply_to(
                    id,
                    HubEvent::failed(InvocationError::invalid_invocation(e.to_string())),
                )
            })
        }
    };

    if let Some(completion) = completion {
        // Waits for room rather than dropping the caller's own ack. Fails only
        // when the writer is gone.
        if reply.send(completion).await.is_err() {
            tracing::debug!(connection = %caller, "completion dropped, writer closed");
        }
    }
}
