//! Error types shared across layers.

use thiserror::Error;

/// Errors in the crypto layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Key material has the wrong length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKey {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// AEAD encryption failed.
    #[error("AEAD encryption failed")]
    EncryptionFailed,

    /// AEAD decryption failed (wrong key, invalid tag or corrupted).
    #[error("AEAD decryption failed (wrong key, invalid tag or corrupted)")]
    DecryptionFailed,

    /// Token is truncated or carries an unknown version.
    #[error("malformed token")]
    MalformedToken,

    /// Token timestamp is outside the freshness window.
    #[error("token expired")]
    TokenExpired,
}

/// Invalid engine configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Initial congestion window below one packet.
    #[error("initial congestion window must be at least 1, got {0}")]
    InitialWindow(f64),

    /// Slow-start threshold below one packet.
    #[error("slow-start threshold must be at least 1, got {0}")]
    SlowStartThreshold(f64),

    /// Receive window of zero packets.
    #[error("receive window must be non-zero")]
    ReceiveWindow,

    /// Maximum segment size of zero bytes.
    #[error("maximum segment size must be non-zero")]
    SegmentSize,

    /// Zero-length timeout.
    #[error("{0} timeout must be non-zero")]
    Timeout(&'static str),

    /// Loss probability outside `[0, 1]`.
    #[error("loss probability must lie in [0, 1], got {0}")]
    LossProbability(f64),
}
