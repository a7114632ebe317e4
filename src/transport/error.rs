//! Transport layer error types.
//!
//! Malformed datagrams are dropped without a reply; only timeouts on the
//! handshake or an idle peer, and socket failures, end a connection.

use std::io;

use thiserror::Error;

use super::frame::{FrameError, FrameFlags};

/// Transport layer errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Frame parsing error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// I/O error (socket operations).
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// No SYN-ACK arrived within the handshake budget.
    #[error("handshake timed out after {attempts} attempt(s)")]
    HandshakeTimeout {
        /// SYN transmissions made.
        attempts: u32,
    },

    /// The peer answered the SYN with something other than SYN-ACK.
    #[error("handshake rejected: unexpected reply flags {0:?}")]
    HandshakeRejected(FrameFlags),

    /// The peer stayed silent for longer than the idle timeout.
    #[error("connection timeout")]
    ConnectionTimeout,
}

impl TransportError {
    /// Check if this error should result in silent drop (no response sent).
    pub fn is_silent_drop(&self) -> bool {
        matches!(self, TransportError::Frame(_))
    }

    /// Check if this error is fatal to the connection.
    pub fn is_fatal(&self) -> bool {
        !self.is_silent_drop()
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_drop_errors() {
        let malformed = TransportError::Frame(FrameError::TooShort {
            expected: 10,
            actual: 3,
        });
        assert!(malformed.is_silent_drop());
        assert!(!malformed.is_fatal());
    }

    #[test]
    fn test_fatal_errors() {
        assert!(TransportError::HandshakeTimeout { attempts: 1 }.is_fatal());
        assert!(TransportError::HandshakeRejected(FrameFlags::ACK).is_fatal());
        assert!(TransportError::ConnectionTimeout.is_fatal());
        assert!(TransportError::Io(io::Error::other("test")).is_fatal());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            TransportError::HandshakeTimeout { attempts: 2 }.to_string(),
            "handshake timed out after 2 attempt(s)"
        );
        assert_eq!(
            TransportError::HandshakeRejected(FrameFlags::ACK).to_string(),
            "handshake rejected: unexpected reply flags FrameFlags(ACK)"
        );
    }
}
