//! # Reno Protocol
//!
//! Reliable, ordered, encrypted record transfer over UDP with TCP Reno style
//! congestion control.
//!
//! - **Framing**: 10-byte big-endian header (sequence, ack, flags) plus payload
//! - **Handshake**: SYN carries the session key, SYN|ACK fixes the anchor
//!   sequence number
//! - **Reliability**: cumulative ACKs, duplicate-ACK fast retransmit and
//!   timeout retransmission of the oldest unacknowledged frame
//! - **Congestion control**: slow start, congestion avoidance, multiplicative
//!   decrease
//! - **Confidentiality**: every record sealed as an authenticated token
//!
//! ## Feature Flags
//!
//! - `transport` (default): frames, datagram channels, loss simulation and
//!   the session engines
//! - `crypto` (default): [`SharedKey`](crypto::SharedKey) and
//!   [`TokenCipher`](crypto::TokenCipher)
//! - `serde`: `Serialize` for window history and receive reports
//!
//! ## Modules
//!
//! - [`core`]: constants, error types and the [`FrameCipher`] trait (always included)
//! - [`transport`]: wire format and channels (requires `transport` feature)
//! - [`crypto`]: record encryption (requires `crypto` feature)
//! - [`session`]: handshake, sender and receiver (requires `transport` feature)
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use reno_protocol::prelude::*;
//!
//! let (client, server) = MemoryChannel::pair();
//!
//! let receiver = Receiver::<_, TokenCipher>::bind(server, ReceiverConfig::default())?;
//! let server = tokio::spawn(async move {
//!     let mut out = Vec::new();
//!     receiver.run(&mut out).await.map(|_| out)
//! });
//!
//! let sender = Sender::connect(client, TokenCipher::generate(), SenderConfig::default()).await?;
//! let report = sender.transfer(synthetic_records(100)).await?;
//! assert_eq!(report.final_base, report.anchor + 100);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Transport layer (feature-gated)
#[cfg(feature = "transport")]
#[cfg_attr(docsrs, doc(cfg(feature = "transport")))]
pub mod transport;

// Crypto layer (feature-gated)
#[cfg(feature = "crypto")]
#[cfg_attr(docsrs, doc(cfg(feature = "crypto")))]
pub mod crypto;

// Session engines (need channels)
#[cfg(feature = "transport")]
#[cfg_attr(docsrs, doc(cfg(feature = "transport")))]
pub mod session;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::*;

    #[cfg(feature = "transport")]
    pub use crate::transport::{
        DatagramChannel, Frame, FrameFlags, LossyChannel, MemoryChannel, TransportError,
        TransportResult, UdpChannel, UdpChannelBuilder,
    };

    #[cfg(feature = "transport")]
    pub use crate::session::{
        chunk_records, synthetic_records, ReceiveReport, Receiver, ReceiverConfig,
        ReceiverConfigBuilder, Sender, SenderConfig, SenderConfigBuilder, SessionError,
        SessionResult, TransferReport, WindowHistory,
    };

    #[cfg(feature = "crypto")]
    pub use crate::crypto::*;
}

// Re-export commonly used items at crate root
pub use core::{ConfigError, CryptoError, FrameCipher};

#[cfg(feature = "transport")]
pub use transport::{Frame, FrameFlags};

#[cfg(feature = "transport")]
pub use session::{Receiver, Sender, SessionError};
