//! Client-side error type.

use chathub_shared::{InvocationError, ProtocolError};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("not connected to the hub")]
    NotConnected,

    #[error("connection lost before the hub answered")]
    ConnectionLost,

    #[error("hub did not answer in time")]
    Timeout,

    #[error("hub rejected the call: {0}")]
    Rejected(InvocationError),

    #[error("unexpected reply: {0}")]
    UnexpectedReply(&'static str),

    #[error("name must not be blank")]
    EmptyName,

    #[error("message must not be blank")]
    EmptyMessage,

    #[error("set a name before sending messages")]
    NameNotSet,

    #[error("invalid hub URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
