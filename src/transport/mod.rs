//! Transport Layer
//!
//! This module provides everything between the protocol engines and the
//! network:
//!
//! - **Frame encoding/decoding**: [`Frame`], [`FrameFlags`] and the 10-byte
//!   wire header
//! - **Datagram channels**: the [`DatagramChannel`] trait, [`UdpChannel`] for
//!   real sockets and [`MemoryChannel`] for in-process pairs
//! - **Loss simulation**: [`LossyChannel`] decorator
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │      Session (handshake, engines)       │
//! ├─────────────────────────────────────────┤
//! │         Transport Layer                 │  ← This module
//! │   frames, channels, loss simulation     │
//! ├─────────────────────────────────────────┤
//! │              UDP                        │
//! └─────────────────────────────────────────┘
//! ```

mod channel;
mod error;
mod frame;
mod lossy;
mod socket;

pub use channel::*;
pub use error::*;
pub use frame::*;
pub use lossy::LossyChannel;
pub use socket::*;
