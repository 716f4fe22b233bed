//! Client chat session: naming, sending, and the received transcript.

use chathub_shared::HubEvent;

use crate::error::ClientError;
use crate::stores::{ChatLine, Transcript};
use crate::ws::HubHandle;

pub struct ChatSession {
    handle: HubHandle,
    user: Option<String>,
    transcript: Transcript,
}

impl ChatSession {
    pub fn new(handle: HubHandle) -> Self {
        Self {
            handle,
            user: None,
            transcript: Transcript::new(),
        }
    }

    /// Name this client. The name is trimmed and must not be blank.
    ///
    /// Sending is enabled only after the hub has acknowledged the name.
    pub async fn set_user_name(&mut self, name: &str) -> Result<(), ClientError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClientError::EmptyName);
        }
        self.handle.set_user_name(name).await?;
        self.user = Some(name.to_string());
        Ok(())
    }

    /// Send a chat message under this client's name. Blank messages are
    /// dropped locally; the body itself is sent as typed.
    pub async fn send_message(&self, message: &str) -> Result<(), ClientError> {
        let Some(user) = self.user.as_deref() else {
            return Err(ClientError::NameNotSet);
        };
        if message.trim().is_empty() {
            return Err(ClientError::EmptyMessage);
        }
        self.handle.send_message(user, message).await
    }

    /// Append a pushed event to the transcript, returning the new line.
    pub fn record(&mut self, event: HubEvent) -> Option<&ChatLine> {
        let line = ChatLine::from_event(event)?;
        Some(self.transcript.push(line))
    }

    pub fn can_send(&self) -> bool {
        self.user.is_some()
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }
}
