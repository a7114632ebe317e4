//! Session layer: handshake, sender and receiver engines.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          Application records            │
//! ├─────────────────────────────────────────┤
//! │            Session Layer                │  ← This module
//! │  handshake, Reno window, ordered ACKs   │
//! ├─────────────────────────────────────────┤
//! │          Transport Layer                │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Each side is a single task that exclusively owns its state. The sender
//! alternates between filling the window and one bounded receive; the
//! receiver answers every frame as it arrives.

mod congestion;
mod error;
mod handshake;
mod history;
mod receiver;
mod sender;
mod window;

pub use congestion::{CongestionWindow, ControlState};
pub use error::{SessionError, SessionResult};
pub use handshake::{initiate, respond_to_syn, Accepted};
pub use history::{WindowHistory, WindowSample};
pub use receiver::{
    DeliveryState, ReceiveReport, Receiver, ReceiverConfig, ReceiverConfigBuilder, Reply,
};
pub use sender::{
    chunk_records, synthetic_records, Sender, SenderConfig, SenderConfigBuilder, TransferReport,
};
pub use window::{AckEvent, SendWindow};
