//! Local transcript of everything the hub has pushed to this client.
//!
//! Lines are kept in arrival order. Nothing is sorted, merged, or
//! deduplicated: two identical messages show up twice.

use chathub_shared::HubEvent;

/// One rendered-ready line of the chat.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ChatLine {
    Message { user: String, text: String },
    System { text: String },
}

impl ChatLine {
    /// Convert a broadcast event into a line. Acknowledgements are not part
    /// of the transcript.
    pub fn from_event(event: HubEvent) -> Option<Self> {
        match event {
            HubEvent::ReceiveMessage { user, message } => Some(ChatLine::Message { user, text: message }),
            HubEvent::SystemMessage { text } => Some(ChatLine::System { text }),
            HubEvent::Completion { .. } => None,
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, ChatLine::System { .. })
    }
}

/// Append-only list of chat lines.
#[derive(Default, Clone, PartialEq, Debug)]
pub struct Transcript {
    lines: Vec<ChatLine>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line at the end.
    pub fn push(&mut self, line: ChatLine) -> &ChatLine {
        self.lines.push(line);
        &self.lines[self.lines.len() - 1]
    }

    pub fn lines(&self) -> &[ChatLine] {
        &self.lines
    }
}
