//! Session agent tests against an in-process hub and scripted sockets.

use std::net::SocketAddr;
use std::time::Duration;

use chathub_client::{ChatLine, ChatSession, ClientError, ConnectionState, HubConnection, ReconnectConfig};
use chathub_server::{router, AppState, ConnectionRegistry, ServerConfig};
use chathub_shared::HubEvent;
use futures_util::StreamExt;
use tokio::net::TcpListener;
use tokio::sync::mpsc::UnboundedReceiver;

const WAIT: Duration = Duration::from_secs(5);

fn fast_retry(max_attempts: u32) -> ReconnectConfig {
    ReconnectConfig {
        max_attempts,
        initial_delay_ms: 20,
        max_delay_ms: 50,
        backoff_multiplier: 1.5,
    }
}

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

async fn connect(addr: SocketAddr) -> HubConnection {
    let connection = HubConnection::start(format!("ws://{}/chatHub", addr), fast_retry(3), WAIT);
    let state = tokio::time::timeout(WAIT, connection.wait_for_state(|s| s.is_connected()))
        .await
        .expect("never connected");
    assert_eq!(state, ConnectionState::Connected);
    connection
}

async fn wait_for_connections(registry: &ConnectionRegistry, expected: usize) {
    tokio::time::timeout(WAIT, async {
        while registry.len().await != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("registry never reached {} connections", expected));
}

/// Record the next `n` pushed events into the session transcript.
async fn receive(session: &mut ChatSession, events: &mut UnboundedReceiver<HubEvent>, n: usize) {
    for _ in 0..n {
        let event = tokio::time::timeout(WAIT, events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event stream closed");
        session.record(event);
    }
}

fn system(text: &str) -> ChatLine {
    ChatLine::System { text: text.into() }
}

fn message(user: &str, text: &str) -> ChatLine {
    ChatLine::Message {
        user: user.into(),
        text: text.into(),
    }
}

#[tokio::test]
async fn two_sessions_share_one_transcript() {
    let (addr, registry) = spawn_hub().await;

    let mut alice_conn = connect(addr).await;
    let mut bob_conn = connect(addr).await;
    wait_for_connections(&registry, 2).await;

    let mut alice_events = alice_conn.take_events().unwrap();
    let mut bob_events = bob_conn.take_events().unwrap();
    let mut alice = ChatSession::new(alice_conn.handle());
    let mut bob = ChatSession::new(bob_conn.handle());

    alice.set_user_name("  alice ").await.unwrap();
    assert_eq!(alice.user(), Some("alice"));
    bob.set_user_name("bob").await.unwrap();
    alice.send_message("hi").await.unwrap();

    receive(&mut alice, &mut alice_events, 3).await;
    receive(&mut bob, &mut bob_events, 3).await;

    let expected = vec![
        system("alice has joined the chat"),
        system("bob has joined the chat"),
        message("alice", "hi"),
    ];
    assert_eq!(alice.transcript().lines(), expected.as_slice());
    assert_eq!(bob.transcript().lines(), expected.as_slice());

    alice_conn.close().await;
    receive(&mut bob, &mut bob_events, 1).await;
    assert_eq!(bob.transcript().lines()[3], system("alice has left the chat"));

    bob_conn.close().await;
}

#[tokio::test]
async fn acknowledgement_follows_own_broadcast() {
    let (addr, _registry) = spawn_hub().await;
    let mut conn = connect(addr).await;
    let mut events = conn.take_events().unwrap();
    let mut session = ChatSession::new(conn.handle());

    session.set_user_name("carol").await.unwrap();

    // The join was pushed before the acknowledgement, so it is already queued.
    let event = events.try_recv().expect("join should already be queued");
    assert_eq!(
        session.record(event),
        Some(&system("carol has joined the chat"))
    );

    conn.close().await;
}

#[tokio::test]
async fn events_can_only_be_taken_once() {
    let (addr, _registry) = spawn_hub().await;
    let mut conn = connect(addr).await;

    assert!(conn.take_events().is_some());
    assert!(conn.take_events().is_none());
    conn.close().await;
}

#[tokio::test]
async fn reconnects_after_the_socket_drops() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // First socket is dropped right after the handshake, the second stays up.
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        drop(ws);

        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        while ws.next().await.is_some() {}
    });

    let conn = HubConnection::start(format!("ws://{}/chatHub", addr), fast_retry(5), WAIT);
    let mut states = conn.watch_state();

    let saw_reconnect = tokio::time::timeout(WAIT, async {
        loop {
            states.changed().await.unwrap();
            if matches!(*states.borrow_and_update(), ConnectionState::Reconnecting { .. }) {
                return true;
            }
        }
    })
    .await
    .expect("never tried to reconnect");
    assert!(saw_reconnect);

    let state = tokio::time::timeout(WAIT, conn.wait_for_state(|s| s.is_connected()))
        .await
        .expect("never reconnected");
    assert!(state.is_connected());

    conn.close().await;
    server.await.unwrap();
}

#[tokio::test]
async fn gives_up_after_max_attempts() {
    // Bind and drop to get a port nothing is listening on.
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let conn = HubConnection::start(format!("ws://{}/chatHub", addr), fast_retry(2), WAIT);
    let state = tokio::time::timeout(
        WAIT,
        conn.wait_for_state(|s| matches!(s, ConnectionState::Failed { .. })),
    )
    .await
    .expect("never gave up");

    assert!(matches!(state, ConnectionState::Failed { .. }));
    assert!(matches!(
        conn.handle().set_user_name("dave").await,
        Err(ClientError::NotConnected)
    ));
    conn.close().await;
}

#[tokio::test]
async fn in_flight_invocation_fails_when_connection_drops() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // Read one invocation and hang up without answering.
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let _ = ws.next().await;
    });

    let conn = HubConnection::start(format!("ws://{}/chatHub", addr), fast_retry(1), WAIT);
    tokio::time::timeout(WAIT, conn.wait_for_state(|s| s.is_connected()))
        .await
        .expect("never connected");

    let result = conn.handle().set_user_name("erin").await;
    assert!(matches!(result, Err(ClientError::ConnectionLost)));
    conn.close().await;
}

#[tokio::test]
async fn close_stops_the_connection() {
    let (addr, registry) = spawn_hub().await;
    let conn = connect(addr).await;
    wait_for_connections(&registry, 1).await;

    let handle = conn.handle();
    let mut states = conn.watch_state();
    conn.close().await;

    assert_eq!(*states.borrow_and_update(), ConnectionState::Disconnected);
    assert!(matches!(
        handle.set_user_name("frank").await,
        Err(ClientError::NotConnected)
    ));
    wait_for_connections(&registry, 0).await;
}
