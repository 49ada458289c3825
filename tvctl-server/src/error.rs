//! Server error types.

use thiserror::Error;

/// Server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] tvctl_protocol::ProtocolError),

    #[error("could not bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("broadcast port for command port {port} exceeds 65535 (offset {offset})")]
    BroadcastPortOutOfRange { port: u16, offset: u16 },

    #[error("server socket is not bound")]
    NotBound,
}

impl ServerError {
    /// Returns whether the peer caused this error by sending malformed input.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, ServerError::Protocol(e) if e.is_malformed_input())
    }
}
