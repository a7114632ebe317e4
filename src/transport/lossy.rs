//! Artificial packet loss.
//!
//! [`LossyChannel`] wraps any [`DatagramChannel`] and silently discards each
//! inbound datagram with a fixed probability before the protocol sees it.
//! Outbound traffic is untouched.

use std::io;
use std::time::Duration;

use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio::time::Instant;

use super::channel::DatagramChannel;
use crate::core::ConfigError;

/// Channel decorator that drops inbound datagrams at random.
#[derive(Debug)]
pub struct LossyChannel<C> {
    inner: C,
    loss_probability: f64,
    rng: StdRng,
    dropped: u64,
}

impl<C: DatagramChannel> LossyChannel<C> {
    /// Wrap `inner`, dropping inbound datagrams with `loss_probability`.
    pub fn new(inner: C, loss_probability: f64) -> Result<Self, ConfigError> {
        Self::with_rng(inner, loss_probability, StdRng::from_entropy())
    }

    /// Like [`LossyChannel::new`] but with a reproducible drop pattern.
    pub fn with_seed(inner: C, loss_probability: f64, seed: u64) -> Result<Self, ConfigError> {
        Self::with_rng(inner, loss_probability, StdRng::seed_from_u64(seed))
    }

    fn with_rng(inner: C, loss_probability: f64, rng: StdRng) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&loss_probability) {
            return Err(ConfigError::LossProbability(loss_probability));
        }
        Ok(Self {
            inner,
            loss_probability,
            rng,
            dropped: 0,
        })
    }

    /// Number of datagrams discarded so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Get a reference to the wrapped channel.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Unwrap the inner channel.
    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl<C: DatagramChannel> DatagramChannel for LossyChannel<C> {
    async fn send(&mut self, datagram: &[u8]) -> io::Result<()> {
        self.inner.send(datagram).await
    }

    async fn recv(&mut self, timeout: Duration) -> io::Result<Option<Vec<u8>>> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let Some(datagram) = self.inner.recv(remaining).await? else {
                return Ok(None);
            };
            if self.rng.gen_bool(self.loss_probability) {
                self.dropped += 1;
                log::trace!("simulated loss of {} byte datagram", datagram.len());
                continue;
            }
            return Ok(Some(datagram));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryChannel;

    #[test]
    fn test_rejects_invalid_probability() {
        let (a, _b) = MemoryChannel::pair();
        assert_eq!(
            LossyChannel::new(a, 1.5).unwrap_err(),
            ConfigError::LossProbability(1.5)
        );
        let (a, _b) = MemoryChannel::pair();
        assert!(LossyChannel::new(a, -0.1).is_err());
    }

    #[tokio::test]
    async fn test_zero_loss_passes_everything() {
        let (a, mut b) = MemoryChannel::pair();
        let mut lossy = LossyChannel::with_seed(a, 0.0, 7).unwrap();

        for i in 0u8..20 {
            b.send(&[i]).await.unwrap();
        }
        for i in 0u8..20 {
            let got = lossy.recv(Duration::from_millis(100)).await.unwrap();
            assert_eq!(got, Some(vec![i]));
        }
        assert_eq!(lossy.dropped(), 0);
    }

    #[tokio::test]
    async fn test_total_loss_times_out() {
        let (a, mut b) = MemoryChannel::pair();
        let mut lossy = LossyChannel::with_seed(a, 1.0, 7).unwrap();

        for i in 0u8..5 {
            b.send(&[i]).await.unwrap();
        }
        let got = lossy.recv(Duration::from_millis(30)).await.unwrap();
        assert!(got.is_none());
        assert_eq!(lossy.dropped(), 5);
    }

    #[tokio::test]
    async fn test_partial_loss_keeps_order() {
        let (a, mut b) = MemoryChannel::pair();
        let mut lossy = LossyChannel::with_seed(a, 0.5, 42).unwrap();

        for i in 0u8..100 {
            b.send(&[i]).await.unwrap();
        }
        let mut received = Vec::new();
        while let Some(d) = lossy.recv(Duration::from_millis(30)).await.unwrap() {
            received.push(d[0]);
        }

        assert_eq!(received.len() as u64 + lossy.dropped(), 100);
        assert!(received.windows(2).all(|w| w[0] < w[1]));
    }
}
