//! Congestion window history.
//!
//! The sender records one sample per loop iteration so the window's
//! evolution can be charted after the transfer.

use std::io::{self, Write};
use std::time::Duration;

/// One congestion window observation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct WindowSample {
    /// Seconds since the transfer loop started.
    pub elapsed_secs: f64,
    /// Congestion window in packets.
    pub cwnd: f64,
}

/// Time series of congestion window samples.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct WindowHistory {
    samples: Vec<WindowSample>,
}

impl WindowHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one sample.
    pub fn record(&mut self, elapsed: Duration, cwnd: f64) {
        self.samples.push(WindowSample {
            elapsed_secs: elapsed.as_secs_f64(),
            cwnd,
        });
    }

    /// All samples in recording order.
    pub fn samples(&self) -> &[WindowSample] {
        &self.samples
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Largest window observed.
    pub fn max_cwnd(&self) -> Option<f64> {
        self.samples.iter().map(|s| s.cwnd).reduce(f64::max)
    }

    /// Write `elapsed_secs,cwnd` rows with a header line.
    pub fn write_csv<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(out, "elapsed_secs,cwnd")?;
        for sample in &self.samples {
            writeln!(out, "{:.6},{}", sample.elapsed_secs, sample.cwnd)?;
        }
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_history() {
        let history = WindowHistory::new();
        assert!(history.is_empty());
        assert_eq!(history.max_cwnd(), None);
    }

    #[test]
    fn test_record_and_max() {
        let mut history = WindowHistory::new();
        history.record(Duration::from_millis(0), 1.0);
        history.record(Duration::from_millis(10), 2.0);
        history.record(Duration::from_millis(20), 1.0);

        assert_eq!(history.len(), 3);
        assert_eq!(history.max_cwnd(), Some(2.0));
        assert_eq!(history.samples()[1].elapsed_secs, 0.01);
    }

    #[test]
    fn test_write_csv() {
        let mut history = WindowHistory::new();
        history.record(Duration::from_millis(500), 1.0);
        history.record(Duration::from_millis(1500), 4.25);

        let mut out = Vec::new();
        history.write_csv(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "elapsed_secs,cwnd\n0.500000,1\n1.500000,4.25\n"
        );
    }
}
