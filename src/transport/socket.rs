//! UDP datagram channel.
//!
//! Wraps a tokio [`UdpSocket`] as a [`DatagramChannel`] to a single peer.
//! A receiver-side channel is not connected up front: it latches onto the
//! source address of the most recent datagram and replies there.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::Instant;

use super::channel::DatagramChannel;
use crate::core::{HEADER_SIZE, RECV_BUFFER_SIZE};

/// UDP socket bound to one peer at a time.
#[derive(Debug)]
pub struct UdpChannel {
    /// The underlying UDP socket.
    socket: UdpSocket,
    /// Where replies go.
    peer: Option<SocketAddr>,
    /// Ignore datagrams from anyone but `peer`.
    connected: bool,
    /// Receive buffer.
    recv_buffer: Vec<u8>,
}

impl UdpChannel {
    /// Bind a channel to the given local address.
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        UdpChannelBuilder::new().bind(addr).await
    }

    /// Fix the peer address (sender side).
    ///
    /// Datagrams from other sources are discarded afterwards.
    pub fn connect(&mut self, peer: SocketAddr) {
        self.peer = Some(peer);
        self.connected = true;
    }

    /// Get the local address.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Current peer, if known.
    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }
}

impl DatagramChannel for UdpChannel {
    async fn send(&mut self, datagram: &[u8]) -> io::Result<()> {
        let peer = self
            .peer
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "no peer address yet"))?;
        self.socket.send_to(datagram, peer).await?;
        Ok(())
    }

    async fn recv(&mut self, timeout: Duration) -> io::Result<Option<Vec<u8>>> {
        let deadline = Instant::now() + timeout;
        loop {
            let received =
                tokio::time::timeout_at(deadline, self.socket.recv_from(&mut self.recv_buffer))
                    .await;
            let (len, from) = match received {
                Err(_) => return Ok(None),
                Ok(Err(e)) if e.kind() == io::ErrorKind::ConnectionReset => continue,
                Ok(result) => result?,
            };

            if self.connected && Some(from) != self.peer {
                log::debug!("dropping datagram from unexpected source {from}");
                continue;
            }
            self.peer = Some(from);
            return Ok(Some(self.recv_buffer[..len].to_vec()));
        }
    }
}

/// Builder for UDP channels with a non-default receive buffer.
///
/// Datagrams longer than the buffer are truncated by the socket, so the
/// buffer must hold a header plus the largest sealed record.
#[derive(Debug, Clone)]
pub struct UdpChannelBuilder {
    recv_buffer_size: usize,
}

impl Default for UdpChannelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl UdpChannelBuilder {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self {
            recv_buffer_size: RECV_BUFFER_SIZE,
        }
    }

    /// Set the receive buffer size, never below one frame header.
    pub fn recv_buffer_size(mut self, size: usize) -> Self {
        self.recv_buffer_size = size.max(HEADER_SIZE);
        self
    }

    /// Bind to the given address and create a channel.
    pub async fn bind(self, addr: SocketAddr) -> io::Result<UdpChannel> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(UdpChannel {
            socket,
            peer: None,
            connected: false,
            recv_buffer: vec![0u8; self.recv_buffer_size],
        })
    }
}
