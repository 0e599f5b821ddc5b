use thiserror::Error;

use webchat_protocol::{Status, StatusError, REASON_NOT_CONNECTED};
use webchat_transport::TransportError;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat is not connected")]
    NotConnected,

    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("web service reported a failure: {0}")]
    Status(#[from] StatusError),

    #[error("unable to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("server returned no configuration")]
    EmptyServerConfiguration,
}

pub type ChatResult<T> = Result<T, ChatError>;

impl ChatError {
    /// Dotted reason code, when the failure has one.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::NotConnected => Some(REASON_NOT_CONNECTED),
            Self::Status(error) => Some(error.reason()),
            _ => None,
        }
    }

    /// Compares against a well-known status, ignoring parameters.
    pub fn is_a(&self, reference: &Status) -> bool {
        match self {
            Self::NotConnected => Status::not_connected().is_a(reference),
            Self::Status(error) => error.is_a(reference),
            _ => false,
        }
    }

    pub fn is_service_unavailable(&self) -> bool {
        match self {
            Self::Transport(error) => error.is_service_unavailable(),
            Self::Status(error) => error.is_a(&Status::service_unavailable()),
            _ => false,
        }
    }
}
