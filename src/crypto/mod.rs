//! Security layer.
//!
//! - [`SharedKey`]: 32-byte symmetric key, generated by the sender and
//!   transported in the clear inside the SYN payload
//! - [`TokenCipher`]: the default [`FrameCipher`](crate::core::FrameCipher),
//!   sealing each record as a timestamped XChaCha20-Poly1305 token

mod keys;
mod token;

pub use keys::SharedKey;
pub use token::{TokenCipher, MIN_TOKEN_SIZE};
