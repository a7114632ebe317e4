//! Sender engine: Reno congestion control over a cumulative-ACK window.
//!
//! Each loop iteration sends everything the effective window allows, then
//! waits for exactly one inbound datagram or a receive timeout. A timeout
//! collapses the window and resends only the oldest unacknowledged frame.

use std::time::Duration;

use tokio::time::Instant;

use super::congestion::CongestionWindow;
use super::error::{SessionError, SessionResult};
use super::handshake;
use super::history::WindowHistory;
use super::window::{AckEvent, SendWindow};
use crate::core::{
    ConfigError, FrameCipher, DEFAULT_FIN_RETRIES, DEFAULT_HANDSHAKE_RETRIES,
    DEFAULT_RECEIVE_WINDOW, DEFAULT_RECV_TIMEOUT, INITIAL_CWND, INITIAL_SSTHRESH, MSS,
};
use crate::transport::{DatagramChannel, Frame, FrameFlags};

/// Sender configuration.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// How long one receive phase waits before declaring a timeout.
    pub recv_timeout: Duration,

    /// Congestion window at the start of the transfer, in packets.
    pub initial_cwnd: f64,

    /// Slow-start threshold at the start of the transfer, in packets.
    pub initial_ssthresh: f64,

    /// Receiver-advertised window, in packets. Fixed for the transfer.
    pub receive_window: u32,

    /// Largest record accepted for a single frame, before encryption.
    pub mss: usize,

    /// SYN retransmissions before the handshake fails.
    pub handshake_retries: u32,

    /// FIN retransmissions before closing without acknowledgment.
    pub fin_retries: u32,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            recv_timeout: DEFAULT_RECV_TIMEOUT,
            initial_cwnd: INITIAL_CWND,
            initial_ssthresh: INITIAL_SSTHRESH,
            receive_window: DEFAULT_RECEIVE_WINDOW,
            mss: MSS,
            handshake_retries: DEFAULT_HANDSHAKE_RETRIES,
            fin_retries: DEFAULT_FIN_RETRIES,
        }
    }
}

impl SenderConfig {
    /// Check that the configuration can drive a transfer.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.recv_timeout.is_zero() {
            return Err(ConfigError::Timeout("receive"));
        }
        if !(self.initial_cwnd >= 1.0 && self.initial_cwnd.is_finite()) {
            return Err(ConfigError::InitialWindow(self.initial_cwnd));
        }
        if !(self.initial_ssthresh >= 1.0 && self.initial_ssthresh.is_finite()) {
            return Err(ConfigError::SlowStartThreshold(self.initial_ssthresh));
        }
        if self.receive_window == 0 {
            return Err(ConfigError::ReceiveWindow);
        }
        if self.mss == 0 {
            return Err(ConfigError::SegmentSize);
        }
        Ok(())
    }
}

/// Builder for [`SenderConfig`].
#[derive(Debug, Default)]
pub struct SenderConfigBuilder {
    config: SenderConfig,
}

impl SenderConfigBuilder {
    /// Start from the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the receive-phase timeout.
    pub fn recv_timeout(mut self, timeout: Duration) -> Self {
        self.config.recv_timeout = timeout;
        self
    }

    /// Set the initial congestion window.
    pub fn initial_cwnd(mut self, cwnd: f64) -> Self {
        self.config.initial_cwnd = cwnd;
        self
    }

    /// Set the initial slow-start threshold.
    pub fn initial_ssthresh(mut self, ssthresh: f64) -> Self {
        self.config.initial_ssthresh = ssthresh;
        self
    }

    /// Set the receive window.
    pub fn receive_window(mut self, packets: u32) -> Self {
        self.config.receive_window = packets;
        self
    }

    /// Set the maximum segment size.
    pub fn mss(mut self, bytes: usize) -> Self {
        self.config.mss = bytes;
        self
    }

    /// Set the number of SYN retransmissions.
    pub fn handshake_retries(mut self, retries: u32) -> Self {
        self.config.handshake_retries = retries;
        self
    }

    /// Set the number of FIN retransmissions.
    pub fn fin_retries(mut self, retries: u32) -> Self {
        self.config.fin_retries = retries;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> SenderConfig {
        self.config
    }
}

/// Summary of a completed transfer.
#[derive(Debug, Clone)]
pub struct TransferReport {
    /// Sequence number of the first data frame.
    pub anchor: u32,
    /// Window base when the loop ended (`anchor + records`).
    pub final_base: u32,
    /// First transmissions of data frames.
    pub frames_sent: u64,
    /// Data frames resent after a timeout or fast retransmit.
    pub retransmissions: u64,
    /// Fast retransmit events.
    pub fast_retransmits: u64,
    /// Receive timeouts.
    pub timeouts: u64,
    /// Frames with the ACK flag processed by the window.
    pub acks_received: u64,
    /// Datagrams too short to hold a header, dropped silently.
    pub malformed_frames: u64,
    /// Whether the receiver answered the FIN.
    pub fin_acknowledged: bool,
    /// Wall time of the data loop and teardown.
    pub elapsed: Duration,
    /// One congestion window sample per loop iteration.
    pub history: WindowHistory,
}

/// An established sending endpoint.
///
/// # Example
///
/// ```rust,ignore
/// use reno_protocol::prelude::*;
///
/// let mut channel = UdpChannel::bind("0.0.0.0:0".parse()?).await?;
/// channel.connect(server);
/// let sender = Sender::connect(channel, TokenCipher::generate(), SenderConfig::default()).await?;
/// let report = sender.transfer(synthetic_records(1000)).await?;
/// println!("peak cwnd {:?}", report.history.max_cwnd());
/// ```
#[derive(Debug)]
pub struct Sender<T, C> {
    channel: T,
    cipher: C,
    config: SenderConfig,
    anchor: u32,
}

impl<T, C> Sender<T, C>
where
    T: DatagramChannel,
    C: FrameCipher,
{
    /// Validate the configuration and perform the handshake.
    pub async fn connect(mut channel: T, cipher: C, config: SenderConfig) -> SessionResult<Self> {
        config.validate()?;
        let anchor = handshake::initiate(
            &mut channel,
            &cipher,
            config.recv_timeout,
            config.handshake_retries,
        )
        .await?;

        Ok(Self {
            channel,
            cipher,
            config,
            anchor,
        })
    }

    /// Sequence number the first data frame will carry.
    pub fn anchor(&self) -> u32 {
        self.anchor
    }

    /// Active configuration.
    pub fn config(&self) -> &SenderConfig {
        &self.config
    }

    /// Send every record in order, then close with FIN.
    ///
    /// Returns once the receiver has cumulatively acknowledged all records.
    pub async fn transfer(mut self, records: Vec<Vec<u8>>) -> SessionResult<TransferReport> {
        let end = self.check_records(&records)?;
        let anchor = self.anchor;

        let mut window = SendWindow::new(anchor);
        let mut cc = CongestionWindow::new(self.config.initial_cwnd, self.config.initial_ssthresh);
        let mut report = TransferReport {
            anchor,
            final_base: anchor,
            frames_sent: 0,
            retransmissions: 0,
            fast_retransmits: 0,
            timeouts: 0,
            acks_received: 0,
            malformed_frames: 0,
            fin_acknowledged: false,
            elapsed: Duration::ZERO,
            history: WindowHistory::new(),
        };

        let started = Instant::now();
        let mut pending = records.into_iter();

        while window.base() < end {
            // Transmit phase.
            let effective = cc.effective_window(self.config.receive_window);
            while window.can_send(effective) && window.next() < end {
                let Some(record) = pending.next() else {
                    break;
                };
                let sequence = window.next();
                let encoded = Frame::data(sequence, self.cipher.encrypt(&record)?).encode();
                self.channel.send(&encoded).await?;
                window.record_sent(encoded);
                report.frames_sent += 1;
                log::debug!("→ DATA seq={sequence} ({} in flight)", window.in_flight());
            }

            // Receive phase.
            match self.channel.recv(self.config.recv_timeout).await? {
                Some(datagram) => {
                    self.on_datagram(&datagram, &mut window, &mut cc, &mut report)
                        .await?;
                }
                None => {
                    report.timeouts += 1;
                    log::warn!(
                        "timeout at base {}, cwnd {:.2} -> 1",
                        window.base(),
                        cc.cwnd()
                    );
                    cc.on_timeout();
                    window.on_timeout();
                    if let Some(frame) = window.oldest_unacked() {
                        self.channel.send(frame).await?;
                        report.retransmissions += 1;
                        log::debug!("→ DATA seq={} (retransmit)", window.base());
                    }
                }
            }

            let elapsed = started.elapsed();
            report.history.record(elapsed, cc.cwnd());
            log::trace!(
                "t={:.3}s cwnd={:.2} ssthresh={:.2} state={:?}",
                elapsed.as_secs_f64(),
                cc.cwnd(),
                cc.ssthresh(),
                cc.state()
            );
        }

        report.final_base = window.base();
        log::info!(
            "all {} records acknowledged, closing",
            end.wrapping_sub(anchor)
        );
        report.fin_acknowledged = self.close(window.next()).await?;
        report.elapsed = started.elapsed();
        Ok(report)
    }

    /// Reject oversize records and record counts that overflow the
    /// sequence space. Returns the sequence number one past the last record.
    fn check_records(&self, records: &[Vec<u8>]) -> SessionResult<u32> {
        let max = self.config.mss;
        if let Some((index, record)) = records.iter().enumerate().find(|(_, r)| r.len() > max) {
            return Err(SessionError::RecordTooLarge {
                index,
                len: record.len(),
                max,
            });
        }

        u32::try_from(records.len())
            .ok()
            .and_then(|count| self.anchor.checked_add(count))
            .ok_or(SessionError::SequenceSpaceExhausted {
                anchor: self.anchor,
                records: records.len(),
            })
    }

    async fn on_datagram(
        &mut self,
        datagram: &[u8],
        window: &mut SendWindow,
        cc: &mut CongestionWindow,
        report: &mut TransferReport,
    ) -> SessionResult<()> {
        let frame = match Frame::from_datagram(datagram) {
            Ok(frame) => frame,
            Err(e) if e.is_silent_drop() => {
                report.malformed_frames += 1;
                log::debug!("dropping malformed datagram: {e}");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        if frame.flags.contains(FrameFlags::SYN) || !frame.flags.contains(FrameFlags::ACK) {
            log::debug!("ignoring {:?} during transfer", frame.flags);
            return Ok(());
        }

        report.acks_received += 1;
        log::debug!("← ACK ack={}", frame.ack);

        match window.on_ack(frame.ack) {
            AckEvent::Advanced { acked } => cc.on_new_ack(acked),
            AckEvent::Duplicate { count } => {
                log::debug!("duplicate ACK {} (#{count})", frame.ack);
            }
            AckEvent::FastRetransmit => {
                report.fast_retransmits += 1;
                cc.on_fast_retransmit();
                log::warn!(
                    "third duplicate ACK {}, fast retransmit (cwnd {:.2}, ssthresh {:.2})",
                    frame.ack,
                    cc.cwnd(),
                    cc.ssthresh()
                );
                if let Some(encoded) = window.oldest_unacked() {
                    self.channel.send(encoded).await?;
                    report.retransmissions += 1;
                    log::debug!("→ DATA seq={} (fast retransmit)", window.base());
                }
            }
            AckEvent::Ignored => log::trace!("ignoring ACK {}", frame.ack),
        }
        Ok(())
    }

    /// Send FIN and wait for ACK|FIN, retrying up to `fin_retries` times.
    async fn close(&mut self, sequence: u32) -> SessionResult<bool> {
        let fin = Frame::fin(sequence).encode();
        let attempts = self.config.fin_retries.saturating_add(1);

        for attempt in 1..=attempts {
            self.channel.send(&fin).await?;
            log::info!("→ FIN seq={sequence} (attempt {attempt}/{attempts})");

            let deadline = Instant::now() + self.config.recv_timeout;
            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                let Some(datagram) = self.channel.recv(remaining).await? else {
                    break;
                };
                match Frame::from_datagram(&datagram) {
                    Ok(frame) if frame.flags.is_fin_ack() => {
                        log::info!("← ACK|FIN ack={}, connection closed", frame.ack);
                        return Ok(true);
                    }
                    Ok(frame) => log::trace!("ignoring {:?} while closing", frame.flags),
                    Err(e) if e.is_silent_drop() => {
                        log::debug!("dropping malformed datagram: {e}");
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        log::warn!("FIN unacknowledged after {attempts} attempts, closing anyway");
        Ok(false)
    }
}

/// Split a byte stream into records of at most `mss` bytes.
pub fn chunk_records(bytes: &[u8], mss: usize) -> Vec<Vec<u8>> {
    bytes.chunks(mss.max(1)).map(<[u8]>::to_vec).collect()
}

/// Synthetic workload: record `i` is `"Pct {i:04} "` repeated ten times.
pub fn synthetic_records(count: usize) -> Vec<Vec<u8>> {
    (0..count)
        .map(|i| format!("Pct {i:04} ").repeat(10).into_bytes())
        .collect()
}
