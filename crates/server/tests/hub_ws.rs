//! End-to-end hub tests over real WebSocket connections.

use std::net::SocketAddr;
use std::time::Duration;

use chathub_server::{router, AppState, ConnectionRegistry, ServerConfig};
use chathub_shared::{HubEvent, HubInvocation, WsEnvelope};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

async fn spawn_hub() -> (SocketAddr, ConnectionRegistry) {
    let registry = ConnectionRegistry::new();
    let app = router(AppState::with_registry(registry.clone()), &ServerConfig::default());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, registry)
}

async fn connect(addr: SocketAddr) -> Client {
    let (ws, _) = connect_async(format!("ws://{}/chatHub", addr)).await.unwrap();
    ws
}

/// Upgrades finish on the server after the client sees the handshake, so
/// wait for the registry to catch up.
async fn wait_for_connections(registry: &ConnectionRegistry, expected: usize) {
    tokio::time::timeout(WAIT, async {
        while registry.len().await != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("registry never reached {} connections", expected));
}

async fn next_envelope(ws: &mut Client) -> WsEnvelope<HubEvent> {
    loop {
        let msg = tokio::time::timeout(WAIT, ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

/// Next broadcast event, skipping acknowledgements.
async fn next_event(ws: &mut Client) -> HubEvent {
    loop {
        let env = next_envelope(ws).await;
        if env.payload.is_broadcast() {
            return env.payload;
        }
    }
}

/// Invoke and wait for the completion, returning broadcast events seen on
/// the way.
async fn invoke(ws: &mut Client, invocation: HubInvocation) -> (HubEvent, Vec<HubEvent>) {
    let env = WsEnvelope::new(invocation);
    ws.send(Message::Text(serde_json::to_string(&env).unwrap().into()))
        .await
        .unwrap();

    let mut seen = Vec::new();
    loop {
        let reply = next_envelope(ws).await;
        if reply.correlation_id.as_deref() == Some(env.id.as_str()) {
            return (reply.payload, seen);
        }
        seen.push(reply.payload);
    }
}

fn set_name(name: &str) -> HubInvocation {
    HubInvocation::SetUserName { name: name.into() }
}

fn say(user: &str, message: &str) -> HubInvocation {
    HubInvocation::SendMessage {
        user: user.into(),
        message: message.into(),
    }
}

#[tokio::test]
async fn two_clients_see_the_same_sequence() {
    let (addr, registry) = spawn_hub().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    wait_for_connections(&registry, 2).await;

    let (done, mut seen_a) = invoke(&mut a, set_name("alice")).await;
    assert_eq!(done, HubEvent::completed());
    let (_, mut seen_b) = invoke(&mut b, set_name("bob")).await;
    let (_, more) = invoke(&mut a, say("alice", "hi")).await;
    seen_a.extend(more);
    seen_b.push(next_event(&mut b).await);

    let expected = vec![
        HubEvent::system("alice has joined the chat"),
        HubEvent::system("bob has joined the chat"),
        HubEvent::message("alice", "hi"),
    ];
    assert_eq!(seen_a, expected);
    assert_eq!(seen_b, expected);
}

#[tokio::test]
async fn sender_receives_its_own_message() {
    let (addr, registry) = spawn_hub().await;
    let mut a = connect(addr).await;
    wait_for_connections(&registry, 1).await;

    let (_, seen) = invoke(&mut a, say("solo", "echo?")).await;
    assert_eq!(seen, vec![HubEvent::message("solo", "echo?")]);
}

#[tokio::test]
async fn named_client_leaving_is_announced() {
    let (addr, registry) = spawn_hub().await;
    let mut watcher = connect(addr).await;
    let mut alice = connect(addr).await;
    wait_for_connections(&registry, 2).await;

    invoke(&mut alice, set_name("Alice")).await;
    alice.close(None).await.unwrap();
    wait_for_connections(&registry, 1).await;

    assert_eq!(
        next_event(&mut watcher).await,
        HubEvent::system("Alice has joined the chat")
    );
    assert_eq!(
        next_event(&mut watcher).await,
        HubEvent::system("Alice has left the chat")
    );

    // Nothing else was queued before this marker.
    let (_, seen) = invoke(&mut watcher, say("w", "marker")).await;
    assert_eq!(seen, vec![HubEvent::message("w", "marker")]);
}

#[tokio::test]
async fn anonymous_drop_is_silent() {
    let (addr, registry) = spawn_hub().await;
    let mut watcher = connect(addr).await;
    let lurker = connect(addr).await;
    wait_for_connections(&registry, 2).await;

    // Abrupt drop without a close handshake.
    drop(lurker);
    wait_for_connections(&registry, 1).await;

    let (_, seen) = invoke(&mut watcher, say("w", "still here")).await;
    assert_eq!(seen, vec![HubEvent::message("w", "still here")]);
}

#[tokio::test]
async fn malformed_frame_gets_error_completion() {
    let (addr, registry) = spawn_hub().await;
    let mut ws = connect(addr).await;
    wait_for_connections(&registry, 1).await;

    let frame = r#"{"id":"bad-1","type":"Shout","data":{},"ts":"2024-01-01T00:00:00Z"}"#;
    ws.send(Message::Text(frame.to_string().into())).await.unwrap();

    let reply = next_envelope(&mut ws).await;
    assert_eq!(reply.correlation_id.as_deref(), Some("bad-1"));
    match reply.payload {
        HubEvent::Completion { error: Some(err) } => {
            assert_eq!(err.code, chathub_shared::INVALID_INVOCATION)
        }
        other => panic!("unexpected reply: {:?}", other),
    }

    // The connection survives.
    let (done, _) = invoke(&mut ws, set_name("after")).await;
    assert_eq!(done, HubEvent::completed());
}

#[tokio::test]
async fn registry_tracks_open_connections() {
    let (addr, registry) = spawn_hub().await;
    let mut clients = Vec::new();
    for _ in 0..5 {
        clients.push(connect(addr).await);
    }
    wait_for_connections(&registry, 5).await;

    invoke(&mut clients[0], set_name("x")).await;
    let closing = clients.drain(..3).collect::<Vec<_>>();
    for mut ws in closing {
        ws.close(None).await.unwrap();
    }
    wait_for_connections(&registry, 2).await;
}

#[tokio::test]
async fn client_close_completes_the_handshake() {
    let (addr, registry) = spawn_hub().await;
    let mut ws = connect(addr).await;
    wait_for_connections(&registry, 1).await;

    ws.close(None).await.unwrap();

    let mut saw_close_reply = false;
    loop {
        let msg = tokio::time::timeout(WAIT, ws.next())
            .await
            .expect("timed out waiting for close reply");
        match msg {
            Some(Ok(Message::Close(_))) => saw_close_reply = true,
            Some(Ok(_)) => {}
            Some(Err(e)) => panic!("close handshake not completed: {}", e),
            None => break,
        }
    }
    assert!(saw_close_reply);
    wait_for_connections(&registry, 0).await;
}
