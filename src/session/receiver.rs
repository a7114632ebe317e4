//! Receiver engine: in-order delivery with cumulative ACKs.
//!
//! [`DeliveryState`] is the pure per-frame logic; [`Receiver`] drives it
//! from a [`DatagramChannel`] until FIN or an idle timeout.
//!
//! | Frame                      | Action                                        |
//! |----------------------------|-----------------------------------------------|
//! | SYN                        | install key, reply SYN\|ACK(seq+1)            |
//! | FIN                        | reply ACK\|FIN(seq+1), close                  |
//! | DATA, seq == expected      | decrypt, deliver, ACK(expected+1)             |
//! | DATA, seq != expected      | ACK(expected), nothing delivered              |
//! | DATA, decryption fails     | drop silently                                 |

use std::io::Write;
use std::time::Duration;

use tokio::time::Instant;

use super::error::{SessionError, SessionResult};
use super::handshake;
use crate::core::{ConfigError, FrameCipher, DEAD_INTERVAL};
use crate::transport::{DatagramChannel, Frame, FrameFlags, TransportError};

/// Receiver configuration.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Silence after the handshake that ends the connection.
    pub idle_timeout: Duration,

    /// How long to wait for the first SYN. `None` waits indefinitely.
    pub handshake_timeout: Option<Duration>,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            idle_timeout: DEAD_INTERVAL,
            handshake_timeout: None,
        }
    }
}

impl ReceiverConfig {
    /// Check that the timeouts are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.idle_timeout.is_zero() {
            return Err(ConfigError::Timeout("idle"));
        }
        if self.handshake_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::Timeout("handshake"));
        }
        Ok(())
    }
}

/// Builder for [`ReceiverConfig`].
#[derive(Debug, Default)]
pub struct ReceiverConfigBuilder {
    config: ReceiverConfig,
}

impl ReceiverConfigBuilder {
    /// Start from the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the idle timeout.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// Give up if no SYN arrives within `timeout`.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = Some(timeout);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ReceiverConfig {
        self.config
    }
}

/// What the receiver should do after a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Send this frame and keep going.
    Send(Frame),
    /// Send this frame and stop.
    Close(Frame),
    /// Send nothing.
    Nothing,
}

/// Counters for one receiver.
///
/// A SYN with a new key restarts the connection but not the counters: they
/// keep describing everything written to the sink.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ReceiveReport {
    /// Records delivered to the sink.
    pub delivered_records: u64,
    /// Plaintext bytes delivered to the sink.
    pub delivered_bytes: u64,
    /// ACKs repeated for out-of-order frames.
    pub duplicate_acks_sent: u64,
    /// Frames below the expected sequence number.
    pub stale_frames: u64,
    /// Data frames whose payload failed to decrypt.
    pub decrypt_failures: u64,
    /// Datagrams too short to hold a header.
    pub malformed_frames: u64,
    /// Connections restarted by a SYN with a new key.
    pub restarts: u64,
    /// Time from the handshake to the FIN.
    pub elapsed: Duration,
}

struct Established<C> {
    cipher: C,
    anchor: u32,
    expected: u32,
}

/// Per-connection delivery logic, free of I/O.
pub struct DeliveryState<C> {
    session: Option<Established<C>>,
    report: ReceiveReport,
}

impl<C> std::fmt::Debug for DeliveryState<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryState")
            .field("established", &self.session.is_some())
            .field("expected", &self.session.as_ref().map(|s| s.expected))
            .field("report", &self.report)
            .finish()
    }
}

impl<C> Default for DeliveryState<C> {
    fn default() -> Self {
        Self {
            session: None,
            report: ReceiveReport::default(),
        }
    }
}

impl<C: FrameCipher> DeliveryState<C> {
    /// Start in LISTEN.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a SYN has been accepted.
    pub fn is_established(&self) -> bool {
        self.session.is_some()
    }

    /// Next sequence number to deliver, once established.
    pub fn expected(&self) -> Option<u32> {
        self.session.as_ref().map(|s| s.expected)
    }

    /// Counters so far.
    pub fn report(&self) -> &ReceiveReport {
        &self.report
    }

    /// Apply one decoded frame, writing delivered plaintext to `sink`.
    ///
    /// After a restart the sink still holds the earlier connection's bytes,
    /// followed by the new connection's records from its anchor on.
    pub fn on_frame<W: Write>(&mut self, frame: &Frame, sink: &mut W) -> SessionResult<Reply> {
        if frame.flags.contains(FrameFlags::SYN) {
            return Ok(self.on_syn(frame));
        }

        if frame.flags.contains(FrameFlags::FIN) {
            log::info!("← FIN seq={}, closing", frame.sequence);
            return Ok(Reply::Close(Frame::fin_ack(frame.sequence.wrapping_add(1))));
        }

        if !frame.carries_data() {
            log::trace!("ignoring {:?}", frame.flags);
            return Ok(Reply::Nothing);
        }

        let Some(session) = self.session.as_mut() else {
            log::debug!("dropping DATA seq={} before handshake", frame.sequence);
            return Ok(Reply::Nothing);
        };

        if frame.sequence == session.expected {
            let plaintext = match session.cipher.decrypt(&frame.payload) {
                Ok(plaintext) => plaintext,
                Err(e) => {
                    self.report.decrypt_failures += 1;
                    log::warn!("dropping DATA seq={}: {e}", frame.sequence);
                    return Ok(Reply::Nothing);
                }
            };
            sink.write_all(&plaintext).map_err(SessionError::Sink)?;
            session.expected = session.expected.wrapping_add(1);
            self.report.delivered_records += 1;
            self.report.delivered_bytes += plaintext.len() as u64;
            log::debug!("← DATA seq={} delivered, → ACK ack={}", frame.sequence, session.expected);
        } else if frame.sequence > session.expected {
            self.report.duplicate_acks_sent += 1;
            log::debug!(
                "← DATA seq={} out of order, → ACK ack={}",
                frame.sequence,
                session.expected
            );
        } else {
            self.report.stale_frames += 1;
            log::debug!(
                "← DATA seq={} already delivered, → ACK ack={}",
                frame.sequence,
                session.expected
            );
        }

        Ok(Reply::Send(Frame::ack(session.expected)))
    }

    fn on_syn(&mut self, syn: &Frame) -> Reply {
        if let Some(session) = &self.session {
            if session.cipher.key_material() == syn.payload {
                log::debug!("duplicate SYN, resending SYN|ACK ack={}", session.anchor);
                return Reply::Send(Frame::syn_ack(session.anchor));
            }
        }

        match handshake::respond_to_syn::<C>(syn) {
            Ok(accepted) => {
                if self.session.is_some() {
                    self.report.restarts += 1;
                    log::info!(
                        "SYN with a new key, restarting connection ({} records kept in the sink)",
                        self.report.delivered_records
                    );
                }
                log::info!("← SYN, expecting seq {}", accepted.expected);
                self.session = Some(Established {
                    cipher: accepted.cipher,
                    anchor: accepted.expected,
                    expected: accepted.expected,
                });
                Reply::Send(accepted.reply)
            }
            Err(e) => {
                log::warn!("rejecting SYN: {e}");
                Reply::Nothing
            }
        }
    }
}

/// A listening endpoint that delivers one connection's data.
#[derive(Debug)]
pub struct Receiver<T, C> {
    channel: T,
    config: ReceiverConfig,
    state: DeliveryState<C>,
}

impl<T, C> Receiver<T, C>
where
    T: DatagramChannel,
    C: FrameCipher,
{
    /// Wrap a channel after validating the configuration.
    pub fn bind(channel: T, config: ReceiverConfig) -> SessionResult<Self> {
        config.validate()?;
        Ok(Self {
            channel,
            config,
            state: DeliveryState::new(),
        })
    }

    /// Underlying channel.
    pub fn channel(&self) -> &T {
        &self.channel
    }

    /// Serve one connection, writing delivered bytes to `sink`.
    ///
    /// Returns after answering FIN. Fails with
    /// [`TransportError::ConnectionTimeout`] if the peer goes silent.
    pub async fn run<W: Write>(mut self, mut sink: W) -> SessionResult<ReceiveReport> {
        let listening_since = Instant::now();
        let mut established_at: Option<Instant> = None;

        loop {
            let wait = match (established_at, self.config.handshake_timeout) {
                (None, Some(limit)) => {
                    let remaining = limit.saturating_sub(listening_since.elapsed());
                    if remaining.is_zero() {
                        return Err(TransportError::ConnectionTimeout.into());
                    }
                    remaining
                }
                _ => self.config.idle_timeout,
            };

            let Some(datagram) = self.channel.recv(wait).await? else {
                if established_at.is_some() || self.config.handshake_timeout.is_some() {
                    log::warn!("no traffic for {wait:?}, giving up");
                    return Err(TransportError::ConnectionTimeout.into());
                }
                log::trace!("still listening");
                continue;
            };

            let frame = match Frame::from_datagram(&datagram) {
                Ok(frame) => frame,
                Err(e) if e.is_silent_drop() => {
                    self.state.report.malformed_frames += 1;
                    log::debug!("dropping malformed datagram: {e}");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let reply = self.state.on_frame(&frame, &mut sink)?;
            if established_at.is_none() && self.state.is_established() {
                established_at = Some(Instant::now());
            }

            match reply {
                Reply::Send(frame) => self.channel.send(&frame.encode()).await?,
                Reply::Close(frame) => {
                    self.channel.send(&frame.encode()).await?;
                    break;
                }
                Reply::Nothing => {}
            }
        }

        sink.flush().map_err(SessionError::Sink)?;

        let mut report = self.state.report;
        report.elapsed = established_at.map(|t| t.elapsed()).unwrap_or_default();
        log::info!(
            "connection closed: {} records, {} bytes in {:.2}s",
            report.delivered_records,
            report.delivered_bytes,
            report.elapsed.as_secs_f64()
        );
        Ok(report)
    }
}
