//! Send window and duplicate-ACK tracking.
//!
//! [`SendWindow`] owns the unacknowledged-frame buffer. Sequence numbers
//! count frames, not bytes: every data frame consumes exactly one.
//!
//! ```text
//!  base                next
//!   │                   │
//! ──┼───────────────────┼──────────────▶ seq space
//!   │ <── in flight ──▶ │ <── sendable ──▶
//! ```
//!
//! Invariants: `base <= next`, and the buffer holds exactly the frames in
//! `[base, next)`.

use std::collections::BTreeMap;

use crate::core::DUP_ACK_THRESHOLD;

/// Outcome of feeding one acknowledgment number to the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckEvent {
    /// Cumulative ACK moved `base` forward by `acked` frames.
    Advanced {
        /// Frames newly acknowledged.
        acked: u32,
    },
    /// Repeat of the last ACK that did not reach the retransmit threshold.
    Duplicate {
        /// Consecutive duplicates so far.
        count: u32,
    },
    /// Exactly the third consecutive duplicate: resend `base`.
    FastRetransmit,
    /// Stale or out-of-range acknowledgment.
    Ignored,
}

/// Sender-side window over the frame sequence space.
#[derive(Debug, Clone)]
pub struct SendWindow {
    /// Oldest unacknowledged sequence number.
    base: u32,
    /// Next sequence number to assign.
    next: u32,
    /// Encoded frames awaiting acknowledgment.
    in_flight: BTreeMap<u32, Vec<u8>>,
    /// Consecutive duplicate ACKs for `last_ack_seen`.
    dup_acks: u32,
    /// Last acknowledgment that advanced the window (-1 before the first).
    last_ack_seen: i64,
}

impl SendWindow {
    /// Create an empty window anchored at the handshake's sequence number.
    pub fn new(anchor: u32) -> Self {
        Self {
            base: anchor,
            next: anchor,
            in_flight: BTreeMap::new(),
            dup_acks: 0,
            last_ack_seen: -1,
        }
    }

    /// Oldest unacknowledged sequence number.
    pub fn base(&self) -> u32 {
        self.base
    }

    /// Next sequence number to assign.
    pub fn next(&self) -> u32 {
        self.next
    }

    /// Frames currently buffered for retransmission.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Consecutive duplicate ACK count.
    pub fn dup_acks(&self) -> u32 {
        self.dup_acks
    }

    /// Last acknowledgment number that advanced the window.
    pub fn last_ack_seen(&self) -> i64 {
        self.last_ack_seen
    }

    /// Whether one more frame fits under `window` outstanding frames.
    pub fn can_send(&self, window: u32) -> bool {
        u64::from(self.next) < u64::from(self.base) + u64::from(window)
    }

    /// Buffer a just-transmitted frame under the next sequence number.
    ///
    /// Returns the sequence number it occupies.
    pub fn record_sent(&mut self, encoded: Vec<u8>) -> u32 {
        let seq = self.next;
        self.in_flight.insert(seq, encoded);
        self.next += 1;
        seq
    }

    /// Process an acknowledgment number.
    pub fn on_ack(&mut self, ack: u32) -> AckEvent {
        if ack > self.base {
            if ack > self.next {
                return AckEvent::Ignored;
            }
            let acked = ack - self.base;
            self.in_flight = self.in_flight.split_off(&ack);
            self.base = ack;
            self.dup_acks = 0;
            self.last_ack_seen = i64::from(ack);
            AckEvent::Advanced { acked }
        } else if i64::from(ack) == self.last_ack_seen {
            self.dup_acks += 1;
            if self.dup_acks == DUP_ACK_THRESHOLD {
                AckEvent::FastRetransmit
            } else {
                AckEvent::Duplicate {
                    count: self.dup_acks,
                }
            }
        } else {
            AckEvent::Ignored
        }
    }

    /// Reset duplicate counting after a receive timeout.
    pub fn on_timeout(&mut self) {
        self.dup_acks = 0;
    }

    /// Encoded frame at `base`, if still buffered.
    pub fn oldest_unacked(&self) -> Option<&[u8]> {
        self.in_flight.get(&self.base).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window_with(anchor: u32, sent: u32) -> SendWindow {
        let mut w = SendWindow::new(anchor);
        for i in 0..sent {
            w.record_sent(vec![i as u8]);
        }
        w
    }

    #[test]
    fn test_initial_state() {
        let w = SendWindow::new(1);
        assert_eq!(w.base(), 1);
        assert_eq!(w.next(), 1);
        assert_eq!(w.in_flight(), 0);
        assert_eq!(w.last_ack_seen(), -1);
        assert!(w.oldest_unacked().is_none());
        assert!(w.can_send(1));
        assert!(!w.can_send(0));
    }

    #[test]
    fn test_record_sent_assigns_sequences() {
        let mut w = SendWindow::new(10);
        assert_eq!(w.record_sent(vec![0xA]), 10);
        assert_eq!(w.record_sent(vec![0xB]), 11);
        assert_eq!(w.next(), 12);
        assert_eq!(w.in_flight(), 2);
        assert!(w.can_send(3));
        assert!(!w.can_send(2));
        assert_eq!(w.oldest_unacked(), Some(&[0xA][..]));
    }

    #[test]
    fn test_cumulative_ack_evicts() {
        let mut w = window_with(1, 5);
        assert_eq!(w.on_ack(4), AckEvent::Advanced { acked: 3 });
        assert_eq!(w.base(), 4);
        assert_eq!(w.in_flight(), 2);
        assert_eq!(w.last_ack_seen(), 4);
        assert_eq!(w.oldest_unacked(), Some(&[3u8][..]));

        assert_eq!(w.on_ack(6), AckEvent::Advanced { acked: 2 });
        assert_eq!(w.in_flight(), 0);
        assert!(w.oldest_unacked().is_none());
    }

    #[test]
    fn test_ack_beyond_next_ignored() {
        let mut w = window_with(1, 2);
        assert_eq!(w.on_ack(9), AckEvent::Ignored);
        assert_eq!(w.base(), 1);
    }

    #[test]
    fn test_third_duplicate_triggers_once() {
        let mut w = window_with(1, 6);
        w.on_ack(2);

        assert_eq!(w.on_ack(2), AckEvent::Duplicate { count: 1 });
        assert_eq!(w.on_ack(2), AckEvent::Duplicate { count: 2 });
        assert_eq!(w.on_ack(2), AckEvent::FastRetransmit);
        assert_eq!(w.on_ack(2), AckEvent::Duplicate { count: 4 });
        assert_eq!(w.on_ack(2), AckEvent::Duplicate { count: 5 });
    }

    #[test]
    fn test_new_ack_resets_duplicates() {
        let mut w = window_with(1, 6);
        w.on_ack(2);
        w.on_ack(2);
        w.on_ack(2);
        assert_eq!(w.dup_acks(), 2);

        w.on_ack(3);
        assert_eq!(w.dup_acks(), 0);
        assert_eq!(w.on_ack(3), AckEvent::Duplicate { count: 1 });
    }

    #[test]
    fn test_timeout_resets_duplicates() {
        let mut w = window_with(1, 6);
        w.on_ack(2);
        w.on_ack(2);
        w.on_ack(2);
        w.on_timeout();
        assert_eq!(w.on_ack(2), AckEvent::Duplicate { count: 1 });
    }

    #[test]
    fn test_ack_at_anchor_before_any_advance_is_not_duplicate() {
        // last_ack_seen starts at -1, so the receiver re-acking the anchor
        // is not counted until some ACK has advanced the window.
        let mut w = window_with(1, 4);
        assert_eq!(w.on_ack(1), AckEvent::Ignored);
        assert_eq!(w.on_ack(1), AckEvent::Ignored);
        assert_eq!(w.dup_acks(), 0);
    }

    #[test]
    fn test_stale_ack_ignored() {
        let mut w = window_with(1, 6);
        w.on_ack(4);
        assert_eq!(w.on_ack(2), AckEvent::Ignored);
        assert_eq!(w.base(), 4);
    }

    #[test]
    fn test_base_is_monotonic() {
        let mut w = window_with(1, 10);
        let mut last = w.base();
        for ack in [3, 2, 3, 3, 7, 1, 5, 11, 9] {
            w.on_ack(ack);
            assert!(w.base() >= last);
            assert!(w.base() <= w.next());
            last = w.base();
        }
        assert_eq!(w.base(), 11);
    }
}
