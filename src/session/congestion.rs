//! Reno congestion window.
//!
//! Pure state machine with no I/O. The window is a fractional packet count;
//! it is only floored when the sender asks how many frames may be in flight.
//!
//! | Event             | ssthresh          | cwnd                   | state              |
//! |-------------------|-------------------|------------------------|--------------------|
//! | new ACK (SS)      | -                 | `+= acked`             | CA once ≥ ssthresh |
//! | new ACK (CA)      | -                 | `+= acked / cwnd`      | -                  |
//! | 3rd duplicate ACK | `max(cwnd/2, 1)`  | `ssthresh + 3`         | unchanged          |
//! | timeout           | `max(cwnd/2, 1)`  | `1`                    | SS                 |

use crate::core::{FAST_RECOVERY_INFLATION, INITIAL_CWND, INITIAL_SSTHRESH, MIN_SSTHRESH};

/// Growth policy currently applied to the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    /// Exponential growth: one packet per acknowledged packet.
    SlowStart,
    /// Additive growth: roughly one packet per window per round trip.
    CongestionAvoidance,
}

/// Congestion window and slow-start threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct CongestionWindow {
    cwnd: f64,
    ssthresh: f64,
    state: ControlState,
}

impl Default for CongestionWindow {
    fn default() -> Self {
        Self::new(INITIAL_CWND, INITIAL_SSTHRESH)
    }
}

impl CongestionWindow {
    /// Create a window in slow start.
    pub fn new(initial_cwnd: f64, ssthresh: f64) -> Self {
        Self {
            cwnd: initial_cwnd.max(1.0),
            ssthresh,
            state: ControlState::SlowStart,
        }
    }

    /// Current congestion window in packets.
    pub fn cwnd(&self) -> f64 {
        self.cwnd
    }

    /// Current slow-start threshold in packets.
    pub fn ssthresh(&self) -> f64 {
        self.ssthresh
    }

    /// Current growth policy.
    pub fn state(&self) -> ControlState {
        self.state
    }

    /// Number of frames that may be unacknowledged at once.
    pub fn effective_window(&self, receive_window: u32) -> u32 {
        self.cwnd.min(f64::from(receive_window)).floor() as u32
    }

    /// Grow the window after a cumulative ACK covering `acked` new packets.
    pub fn on_new_ack(&mut self, acked: u32) {
        let acked = f64::from(acked);
        match self.state {
            ControlState::SlowStart => {
                self.cwnd += acked;
                if self.cwnd >= self.ssthresh {
                    self.state = ControlState::CongestionAvoidance;
                }
            }
            ControlState::CongestionAvoidance => {
                self.cwnd += acked * (1.0 / self.cwnd);
            }
        }
    }

    /// Halve the window on the third duplicate ACK.
    ///
    /// The growth policy is left as it was.
    pub fn on_fast_retransmit(&mut self) {
        self.ssthresh = (self.cwnd / 2.0).max(MIN_SSTHRESH);
        self.cwnd = self.ssthresh + FAST_RECOVERY_INFLATION;
    }

    /// Collapse the window after a receive timeout.
    pub fn on_timeout(&mut self) {
        self.ssthresh = (self.cwnd / 2.0).max(MIN_SSTHRESH);
        self.cwnd = 1.0;
        self.state = ControlState::SlowStart;
    }
}
