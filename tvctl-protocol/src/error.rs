//! Protocol error types.

use thiserror::Error;

/// Errors raised while framing or decoding wire data.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid command code: {0}")]
    InvalidCommandCode(i64),

    #[error("malformed command line: {0:?}")]
    MalformedLine(String),

    #[error("unknown command name: {0}")]
    UnknownCommandName(String),

    #[error("line too long: {len} bytes (max {max})")]
    LineTooLong { len: usize, max: usize },

    #[error("invalid UTF-8 in line")]
    InvalidUtf8,

    #[error("malformed notification: {0:?}")]
    MalformedNotification(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Returns whether the error was caused by the peer sending bad input,
    /// as opposed to a transport failure.
    pub fn is_malformed_input(&self) -> bool {
        !matches!(self, ProtocolError::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::InvalidCommandCode(99);
        assert!(err.to_string().contains("99"));

        let err = ProtocolError::MalformedLine("abc".to_string());
        assert!(err.to_string().contains("abc"));

        let err = ProtocolError::LineTooLong { len: 2000, max: 1024 };
        let msg = err.to_string();
        assert!(msg.contains("2000"));
        assert!(msg.contains("1024"));

        let err = ProtocolError::InvalidUtf8;
        assert!(err.to_string().contains("UTF-8"));
    }

    #[test]
    fn test_malformed_input_classification() {
        assert!(ProtocolError::InvalidCommandCode(-1).is_malformed_input());
        assert!(ProtocolError::InvalidUtf8.is_malformed_input());

        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        assert!(!ProtocolError::Io(io).is_malformed_input());
    }
}
