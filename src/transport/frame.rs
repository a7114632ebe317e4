//! Frame encoding and decoding.
//!
//! Every datagram is one frame: a fixed 10-byte header in network byte order
//! followed by an opaque payload whose length is implied by the datagram.
//!
//! ```text
//! +------------------+------------------+----------+---------------------+
//! | Sequence         | Acknowledgment   | Flags    | Payload             |
//! | 4 bytes (BE32)   | 4 bytes (BE32)   | 2 (BE16) | remaining bytes     |
//! +------------------+------------------+----------+---------------------+
//! ```

use std::fmt;
use std::ops::BitOr;

use thiserror::Error;

use super::error::TransportResult;
use crate::core::{FLAG_ACK, FLAG_DATA, FLAG_FIN, FLAG_SYN, HANDSHAKE_SEQUENCE, HEADER_SIZE};

/// Frame flag bitset.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FrameFlags(u16);

impl FrameFlags {
    /// No flags set.
    pub const NONE: Self = Self(0);
    /// Connection establishment.
    pub const SYN: Self = Self(FLAG_SYN);
    /// Acknowledgment number is meaningful.
    pub const ACK: Self = Self(FLAG_ACK);
    /// Teardown.
    pub const FIN: Self = Self(FLAG_FIN);
    /// Payload carries an encrypted record.
    pub const DATA: Self = Self(FLAG_DATA);

    /// Create flags from the raw wire value.
    pub fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// Get the raw wire value.
    pub fn bits(self) -> u16 {
        self.0
    }

    /// Check whether every flag in `other` is set.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Check for a handshake reply (SYN and ACK both set).
    pub fn is_syn_ack(self) -> bool {
        self.contains(Self::SYN | Self::ACK)
    }

    /// Check for a teardown reply (FIN and ACK both set).
    pub fn is_fin_ack(self) -> bool {
        self.contains(Self::FIN | Self::ACK)
    }
}

impl BitOr for FrameFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for FrameFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::SYN, "SYN"),
            (Self::ACK, "ACK"),
            (Self::FIN, "FIN"),
            (Self::DATA, "DATA"),
        ];
        let set: Vec<&str> = names
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        if set.is_empty() {
            write!(f, "FrameFlags(0x{:04x})", self.0)
        } else {
            write!(f, "FrameFlags({})", set.join("|"))
        }
    }
}

/// Errors that can occur during frame parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Datagram is too short to hold a header.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    TooShort {
        /// Minimum expected size.
        expected: usize,
        /// Actual size received.
        actual: usize,
    },
}

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Sequence number (one per data record).
    pub sequence: u32,
    /// Cumulative acknowledgment: next sequence the peer expects.
    pub ack: u32,
    /// Flag bitset.
    pub flags: FrameFlags,
    /// Opaque payload (encrypted when DATA is set).
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create a frame.
    pub fn new(sequence: u32, ack: u32, flags: FrameFlags, payload: Vec<u8>) -> Self {
        Self {
            sequence,
            ack,
            flags,
            payload,
        }
    }

    /// Handshake initiation carrying raw key material.
    pub fn syn(key_material: Vec<u8>) -> Self {
        Self::new(HANDSHAKE_SEQUENCE, 0, FrameFlags::SYN, key_material)
    }

    /// Handshake reply anchoring the data sequence space at `ack`.
    pub fn syn_ack(ack: u32) -> Self {
        Self::new(0, ack, FrameFlags::SYN | FrameFlags::ACK, Vec::new())
    }

    /// Data frame carrying one encrypted record.
    pub fn data(sequence: u32, payload: Vec<u8>) -> Self {
        Self::new(sequence, 0, FrameFlags::DATA, payload)
    }

    /// Pure cumulative acknowledgment.
    pub fn ack(ack: u32) -> Self {
        Self::new(0, ack, FrameFlags::ACK, Vec::new())
    }

    /// Teardown request.
    pub fn fin(sequence: u32) -> Self {
        Self::new(sequence, 0, FrameFlags::FIN, Vec::new())
    }

    /// Teardown reply.
    pub fn fin_ack(ack: u32) -> Self {
        Self::new(0, ack, FrameFlags::ACK | FrameFlags::FIN, Vec::new())
    }

    /// Whether the payload should be interpreted as a record.
    pub fn carries_data(&self) -> bool {
        self.flags.contains(FrameFlags::DATA)
    }

    /// Serialize to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        encode(self.sequence, self.ack, self.flags, &self.payload)
    }

    /// Parse wire bytes.
    ///
    /// Fails only when the input cannot hold a header; everything after the
    /// header is the payload.
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < HEADER_SIZE {
            return Err(FrameError::TooShort {
                expected: HEADER_SIZE,
                actual: bytes.len(),
            });
        }

        let sequence = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let ack = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let flags = FrameFlags::from_bits(u16::from_be_bytes([bytes[8], bytes[9]]));

        Ok(Self {
            sequence,
            ack,
            flags,
            payload: bytes[HEADER_SIZE..].to_vec(),
        })
    }

    /// Parse a received datagram at a channel boundary.
    ///
    /// Decode failures surface as [`TransportError::Frame`], for which
    /// [`TransportError::is_silent_drop`] holds: the datagram is skipped
    /// without a reply.
    ///
    /// [`TransportError::Frame`]: super::TransportError::Frame
    /// [`TransportError::is_silent_drop`]: super::TransportError::is_silent_drop
    pub fn from_datagram(datagram: &[u8]) -> TransportResult<Self> {
        Ok(Self::decode(datagram)?)
    }
}

/// Encode a frame from its parts without building a [`Frame`].
pub fn encode(sequence: u32, ack: u32, flags: FrameFlags, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(&sequence.to_be_bytes());
    buf.extend_from_slice(&ack.to_be_bytes());
    buf.extend_from_slice(&flags.bits().to_be_bytes());
    buf.extend_from_slice(payload);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MSS;

    #[test]
    fn test_wire_layout() {
        let bytes = encode(1, 0x0203_0405, FrameFlags::DATA, b"xy");
        assert_eq!(hex::encode(&bytes), "000000010203040500087879");
    }

    #[test]
    fn test_header_only_length() {
        let bytes = Frame::ack(7).encode();
        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(&bytes[8..10], &[0x00, 0x02]);
    }

    #[test]
    fn test_frame_roundtrip() {
        let frames = [
            Frame::syn(vec![0xAA; 32]),
            Frame::syn_ack(1),
            Frame::data(u32::MAX, vec![0x5A; MSS]),
            Frame::ack(42),
            Frame::fin(1001),
            Frame::fin_ack(1002),
        ];
        for frame in frames {
            let bytes = frame.encode();
            assert_eq!(bytes.len(), HEADER_SIZE + frame.payload.len());
            assert_eq!(Frame::decode(&bytes).unwrap(), frame);
        }
    }

    #[test]
    fn test_decode_too_short() {
        for len in 0..HEADER_SIZE {
            let data = vec![0u8; len];
            assert_eq!(
                Frame::decode(&data),
                Err(FrameError::TooShort {
                    expected: HEADER_SIZE,
                    actual: len
                })
            );
        }
    }

    #[test]
    fn test_malformed_datagram_is_silent_drop() {
        let err = Frame::from_datagram(&[0x00, 0x01, 0x02]).unwrap_err();
        assert!(err.is_silent_drop());
        assert!(!err.is_fatal());
        assert_eq!(
            err.to_string(),
            "frame error: frame too short: expected at least 10 bytes, got 3"
        );

        let frame = Frame::from_datagram(&Frame::ack(9).encode()).unwrap();
        assert_eq!(frame, Frame::ack(9));
    }

    #[test]
    fn test_decode_keeps_unknown_flag_bits() {
        let bytes = encode(3, 4, FrameFlags::from_bits(0xF00F), &[]);
        let frame = Frame::decode(&bytes).unwrap();
        assert_eq!(frame.flags.bits(), 0xF00F);
        assert!(frame.flags.contains(FrameFlags::SYN | FrameFlags::DATA));
    }

    #[test]
    fn test_frame_flags() {
        let flags = FrameFlags::SYN | FrameFlags::ACK;
        assert!(flags.is_syn_ack());
        assert!(!flags.is_fin_ack());
        assert!(flags.contains(FrameFlags::ACK));
        assert!(!flags.contains(FrameFlags::DATA));
        assert!(FrameFlags::NONE.contains(FrameFlags::NONE));

        assert!(Frame::fin_ack(1).flags.is_fin_ack());
        assert_eq!(format!("{:?}", flags), "FrameFlags(SYN|ACK)");
        assert_eq!(format!("{:?}", FrameFlags::NONE), "FrameFlags(0x0000)");
    }

    #[test]
    fn test_payload_without_data_flag() {
        let frame = Frame::new(5, 0, FrameFlags::NONE, b"ignored".to_vec());
        assert!(!frame.carries_data());
        assert!(Frame::data(5, b"kept".to_vec()).carries_data());
    }
}
