//! Session error types.

use std::io;

use thiserror::Error;

use crate::core::{ConfigError, CryptoError};
use crate::transport::TransportError;

/// Errors that end a handshake or a transfer.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Transport failure (timeouts, socket errors).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Cipher failure while sending.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The output sink rejected delivered bytes.
    #[error("sink error: {0}")]
    Sink(#[source] io::Error),

    /// A record does not fit in one segment.
    #[error("record {index} is {len} bytes, larger than the {max} byte segment size")]
    RecordTooLarge {
        /// Position of the record in the input.
        index: usize,
        /// Record length.
        len: usize,
        /// Configured maximum segment size.
        max: usize,
    },

    /// Too many records for the 32-bit sequence space after the anchor.
    #[error("{records} records do not fit in the sequence space after anchor {anchor}")]
    SequenceSpaceExhausted {
        /// Handshake anchor.
        anchor: u32,
        /// Records requested.
        records: usize,
    },
}

impl From<io::Error> for SessionError {
    fn from(err: io::Error) -> Self {
        SessionError::Transport(TransportError::Io(err))
    }
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
