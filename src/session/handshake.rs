//! Three-way handshake with in-band key transport.
//!
//! ```text
//!  sender                                   receiver
//!    │ ── SYN(seq=0, payload=key) ─────────▶ │  LISTEN
//!    │ ◀──────────── SYN|ACK(ack=seq+1) ──── │  expected = seq+1
//!    │  anchor = ack                         │
//!    │ ── DATA(seq=anchor) ────────────────▶ │
//! ```
//!
//! The key travels unencrypted in the SYN payload. There is no asymmetric
//! exchange; anyone observing the SYN can read the session.

use std::time::Duration;

use tokio::time::Instant;

use super::error::SessionResult;
use crate::core::{CryptoError, FrameCipher};
use crate::transport::{DatagramChannel, Frame, TransportError};

/// Sender side: send SYN and wait for SYN|ACK.
///
/// Returns the anchor sequence number for the first data frame. The SYN is
/// resent up to `retries` times if no reply arrives within `timeout`.
/// Malformed datagrams are skipped; any other well-formed reply fails the
/// handshake.
pub async fn initiate<T, C>(
    channel: &mut T,
    cipher: &C,
    timeout: Duration,
    retries: u32,
) -> SessionResult<u32>
where
    T: DatagramChannel,
    C: FrameCipher,
{
    let syn = Frame::syn(cipher.key_material()).encode();
    let attempts = retries.saturating_add(1);

    for attempt in 1..=attempts {
        channel.send(&syn).await?;
        log::debug!("→ SYN (attempt {attempt}/{attempts})");

        if let Some(anchor) = await_syn_ack(channel, timeout).await? {
            log::info!("handshake complete, anchor sequence {anchor}");
            return Ok(anchor);
        }
        log::warn!("handshake timeout (attempt {attempt}/{attempts})");
    }

    Err(TransportError::HandshakeTimeout { attempts }.into())
}

async fn await_syn_ack<T: DatagramChannel>(
    channel: &mut T,
    timeout: Duration,
) -> SessionResult<Option<u32>> {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let Some(datagram) = channel.recv(remaining).await? else {
            return Ok(None);
        };

        let frame = match Frame::from_datagram(&datagram) {
            Ok(frame) => frame,
            Err(e) if e.is_silent_drop() => {
                log::debug!("dropping malformed datagram during handshake: {e}");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if frame.flags.is_syn_ack() {
            log::debug!("← SYN|ACK ack={}", frame.ack);
            return Ok(Some(frame.ack));
        }
        return Err(TransportError::HandshakeRejected(frame.flags).into());
    }
}

/// A receiver's answer to a SYN.
#[derive(Debug)]
pub struct Accepted<C> {
    /// Cipher built from the transported key.
    pub cipher: C,
    /// First data sequence number the receiver will deliver.
    pub expected: u32,
    /// SYN|ACK to send back.
    pub reply: Frame,
}

/// Receiver side: extract the key from a SYN and build the SYN|ACK.
pub fn respond_to_syn<C: FrameCipher>(syn: &Frame) -> Result<Accepted<C>, CryptoError> {
    let cipher = C::from_key_material(&syn.payload)?;
    let expected = syn.sequence.wrapping_add(1);
    Ok(Accepted {
        cipher,
        expected,
        reply: Frame::syn_ack(expected),
    })
}

#[cfg(all(test, feature = "crypto"))]
mod tests {
    use super::*;
    use crate::crypto::TokenCipher;
    use crate::session::SessionError;
    use crate::transport::{FrameFlags, MemoryChannel};

    const WAIT: Duration = Duration::from_millis(200);

    #[test]
    fn test_respond_to_syn() {
        let local = TokenCipher::generate();
        let syn = Frame::syn(local.key_material());

        let accepted = respond_to_syn::<TokenCipher>(&syn).unwrap();
        assert_eq!(accepted.expected, 1);
        assert_eq!(accepted.reply, Frame::syn_ack(1));

        let token = local.encrypt(b"hello").unwrap();
        assert_eq!(accepted.cipher.decrypt(&token).unwrap(), b"hello");
    }

    #[test]
    fn test_respond_to_syn_bad_key() {
        let syn = Frame::syn(vec![0u8; 7]);
        let result = respond_to_syn::<TokenCipher>(&syn);
        assert!(matches!(result, Err(CryptoError::InvalidKey { actual: 7, .. })));
    }

    #[tokio::test]
    async fn test_initiate_success() {
        let (mut client, mut server) = MemoryChannel::pair();
        let cipher = TokenCipher::generate();
        let key = cipher.key_material();

        let peer = tokio::spawn(async move {
            let datagram = server.recv(WAIT).await.unwrap().unwrap();
            let syn = Frame::decode(&datagram).unwrap();
            assert_eq!(syn.flags, FrameFlags::SYN);
            assert_eq!(syn.sequence, 0);
            assert_eq!(syn.payload, key);
            server.send(&Frame::syn_ack(syn.sequence + 1).encode()).await.unwrap();
        });

        let anchor = initiate(&mut client, &cipher, WAIT, 0).await.unwrap();
        assert_eq!(anchor, 1);
        peer.await.unwrap();
    }

    #[tokio::test]
    async fn test_initiate_skips_malformed() {
        let (mut client, mut server) = MemoryChannel::pair();
        server.send(&[0x01, 0x02]).await.unwrap();
        server.send(&Frame::syn_ack(1).encode()).await.unwrap();

        let anchor = initiate(&mut client, &TokenCipher::generate(), WAIT, 0)
            .await
            .unwrap();
        assert_eq!(anchor, 1);
    }

    #[tokio::test]
    async fn test_initiate_timeout() {
        let (mut client, _server) = MemoryChannel::pair();
        let result = initiate(&mut client, &TokenCipher::generate(), Duration::from_millis(20), 0).await;
        assert!(matches!(
            result,
            Err(SessionError::Transport(TransportError::HandshakeTimeout { attempts: 1 }))
        ));
    }

    #[tokio::test]
    async fn test_initiate_retries_syn() {
        let (mut client, mut server) = MemoryChannel::pair();

        let peer = tokio::spawn(async move {
            // Ignore the first SYN, answer the second.
            server.recv(WAIT).await.unwrap().unwrap();
            let datagram = server.recv(WAIT).await.unwrap().unwrap();
            let syn = Frame::decode(&datagram).unwrap();
            server.send(&Frame::syn_ack(syn.sequence + 1).encode()).await.unwrap();
        });

        let anchor = initiate(&mut client, &TokenCipher::generate(), Duration::from_millis(50), 2)
            .await
            .unwrap();
        assert_eq!(anchor, 1);
        peer.await.unwrap();
    }

    #[tokio::test]
    async fn test_initiate_rejected() {
        let (mut client, mut server) = MemoryChannel::pair();
        server.send(&Frame::ack(1).encode()).await.unwrap();

        let result = initiate(&mut client, &TokenCipher::generate(), WAIT, 3).await;
        assert!(matches!(
            result,
            Err(SessionError::Transport(TransportError::HandshakeRejected(flags))) if flags == FrameFlags::ACK
        ));
    }
}
