//! Unreliable datagram channel abstraction.
//!
//! The engines only need two operations: fire-and-forget send, and a receive
//! that gives up after a bounded wait. A timeout is reported as `Ok(None)`,
//! never as an error, because the sender treats it as a congestion signal.

use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::sync::mpsc;

/// An unreliable, unordered datagram transport to a single peer.
pub trait DatagramChannel: Send {
    /// Send one datagram to the peer.
    fn send(&mut self, datagram: &[u8]) -> impl Future<Output = io::Result<()>> + Send;

    /// Wait up to `timeout` for one datagram.
    ///
    /// Returns `Ok(None)` when the wait expires.
    fn recv(
        &mut self,
        timeout: Duration,
    ) -> impl Future<Output = io::Result<Option<Vec<u8>>>> + Send;
}

/// In-process datagram channel, one end of a connected pair.
///
/// Sends never fail, even after the peer end is dropped, matching UDP.
#[derive(Debug)]
pub struct MemoryChannel {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl MemoryChannel {
    /// Create two connected ends.
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        (
            Self { tx: a_tx, rx: a_rx },
            Self { tx: b_tx, rx: b_rx },
        )
    }
}

impl DatagramChannel for MemoryChannel {
    async fn send(&mut self, datagram: &[u8]) -> io::Result<()> {
        let _ = self.tx.send(datagram.to_vec());
        Ok(())
    }

    async fn recv(&mut self, timeout: Duration) -> io::Result<Option<Vec<u8>>> {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(datagram)) => Ok(Some(datagram)),
            Ok(None) => {
                // Peer gone: behave like a silent socket.
                tokio::time::sleep(timeout).await;
                Ok(None)
            }
            Err(_) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_pair_send_recv() {
        let (mut a, mut b) = MemoryChannel::pair();

        a.send(b"ping").await.unwrap();
        b.send(b"pong").await.unwrap();

        let got = b.recv(Duration::from_millis(100)).await.unwrap();
        assert_eq!(got.as_deref(), Some(&b"ping"[..]));
        let got = a.recv(Duration::from_millis(100)).await.unwrap();
        assert_eq!(got.as_deref(), Some(&b"pong"[..]));
    }

    #[tokio::test]
    async fn test_memory_recv_timeout() {
        let (mut a, _b) = MemoryChannel::pair();
        let got = a.recv(Duration::from_millis(10)).await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn test_memory_send_after_peer_dropped() {
        let (mut a, b) = MemoryChannel::pair();
        drop(b);
        assert!(a.send(b"into the void").await.is_ok());
        assert!(a.recv(Duration::from_millis(10)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_preserves_order() {
        let (mut a, mut b) = MemoryChannel::pair();
        for i in 0u8..5 {
            a.send(&[i]).await.unwrap();
        }
        for i in 0u8..5 {
            let got = b.recv(Duration::from_millis(100)).await.unwrap();
            assert_eq!(got, Some(vec![i]));
        }
    }
}
