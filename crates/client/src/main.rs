//! Chathub Client
//!
//! Line-oriented terminal chat. The first line typed is the user name,
//! every line after that is sent as a message.

use chathub_client::render::{render_line, render_state};
use chathub_client::{ChatSession, ClientConfig, ClientError, HubConnection};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they don't interleave with the chat on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chathub_client=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from_env()?;
    tracing::info!("Connecting to {}", config.url);

    let mut connection = HubConnection::start(config.url.clone(), config.reconnect, config.invoke_timeout);
    let Some(mut events) = connection.take_events() else {
        anyhow::bail!("event stream already taken");
    };
    let mut state = connection.watch_state();
    let mut session = ChatSession::new(connection.handle());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Enter your name:");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if session.can_send() {
                    match session.send_message(&line).await {
                        Ok(()) | Err(ClientError::EmptyMessage) => {}
                        Err(e) => println!("! {}", e),
                    }
                } else {
                    match session.set_user_name(&line).await {
                        Ok(()) => println!("Chatting as {}", line.trim()),
                        Err(e) => println!("! {}", e),
                    }
                }
            }
            Some(event) = events.recv() => {
                let me = session.user().map(str::to_owned);
                if let Some(line) = session.record(event) {
                    println!("{}", render_line(line, me.as_deref()));
                }
            }
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = state.borrow_and_update().clone();
                println!("{}", render_state(&current));
                if matches!(current, chathub_client::ConnectionState::Failed { .. }) {
                    break;
                }
            }
        }
    }

    connection.close().await;
    Ok(())
}
