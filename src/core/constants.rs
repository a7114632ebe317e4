//! Protocol constants.
//!
//! Wire-format values are fixed by the protocol and MUST NOT be changed.
//! Timing and window values are defaults; engines take them from their
//! config structs.

use std::time::Duration;

// =============================================================================
// WIRE FORMAT
// =============================================================================

/// Fixed frame header size: sequence (4) + acknowledgment (4) + flags (2).
pub const HEADER_SIZE: usize = 10;

/// Maximum segment size: payload bytes per data frame before encryption.
pub const MSS: usize = 1024;

/// Connection establishment flag.
pub const FLAG_SYN: u16 = 0x0001;

/// Acknowledgment flag.
pub const FLAG_ACK: u16 = 0x0002;

/// Teardown flag.
pub const FLAG_FIN: u16 = 0x0004;

/// Payload carries an encrypted application record.
pub const FLAG_DATA: u16 = 0x0008;

/// Sequence number carried by the initial SYN.
pub const HANDSHAKE_SEQUENCE: u32 = 0;

/// Datagram receive buffer (65535 byte window plus slack).
pub const RECV_BUFFER_SIZE: usize = 65535 + 100;

// =============================================================================
// CRYPTOGRAPHIC CONSTANTS
// =============================================================================

/// Shared symmetric key size.
pub const KEY_SIZE: usize = 32;

/// XChaCha20 nonce size.
pub const AEAD_NONCE_SIZE: usize = 24;

/// Poly1305 authentication tag size.
pub const AEAD_TAG_SIZE: usize = 16;

/// Leading version byte of every token.
pub const TOKEN_VERSION: u8 = 0x80;

/// Token prefix: version (1) + timestamp (8) + nonce (24).
pub const TOKEN_PREFIX_SIZE: usize = 1 + 8 + AEAD_NONCE_SIZE;

/// Tolerated clock skew for tokens stamped in the future.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(60);

// =============================================================================
// CONGESTION CONTROL
// =============================================================================

/// Initial congestion window (packets).
pub const INITIAL_CWND: f64 = 1.0;

/// Initial slow-start threshold (packets).
pub const INITIAL_SSTHRESH: f64 = 64.0;

/// Fixed advertised receive window (packets).
pub const DEFAULT_RECEIVE_WINDOW: u32 = 1000;

/// Duplicate ACK count that triggers fast retransmit.
pub const DUP_ACK_THRESHOLD: u32 = 3;

/// Window inflation applied after fast retransmit (one per duplicate ACK).
pub const FAST_RECOVERY_INFLATION: f64 = 3.0;

/// Lower bound on the slow-start threshold after a loss event.
pub const MIN_SSTHRESH: f64 = 1.0;

// =============================================================================
// TIMING
// =============================================================================

/// Sender receive timeout; expiry is treated as severe congestion.
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_millis(500);

/// SYN retransmissions before the handshake fails.
pub const DEFAULT_HANDSHAKE_RETRIES: u32 = 0;

/// FIN retransmissions before the sender closes without confirmation.
pub const DEFAULT_FIN_RETRIES: u32 = 3;

/// Receiver gives up after this long without any datagram.
pub const DEAD_INTERVAL: Duration = Duration::from_secs(60);
