//! Plain-text rendering for the terminal client.

use crate::stores::ChatLine;
use crate::ws::ConnectionState;

/// Format one transcript line. `me` marks the local user's own messages.
pub fn render_line(line: &ChatLine, me: Option<&str>) -> String {
    match line {
        ChatLine::System { text } => format!("  -- {} --", text),
        ChatLine::Message { user, text } if me == Some(user.as_str()) => {
            format!("{} (you): {}", user, text)
        }
        ChatLine::Message { user, text } => format!("{}: {}", user, text),
    }
}

/// Status indicator for connection changes.
pub fn render_state(state: &ConnectionState) -> String {
    match state {
        ConnectionState::Disconnected => "[disconnected]".to_string(),
        ConnectionState::Connecting => "[connecting...]".to_string(),
        ConnectionState::Connected => "[connected]".to_string(),
        ConnectionState::Reconnecting { attempt } => format!("[reconnecting, attempt {}]", attempt),
        ConnectionState::Failed { reason } => format!("[connection failed: {}]", reason),
    }
}
