//! Entry point for `reno-transfer`.
//!
//! Runs either side of a transfer over UDP. All protocol work lives in the
//! library; this binary owns argument parsing, logging and file I/O.
//!
//! ```text
//! reno-transfer receive --bind 127.0.0.1:12345 --output received.bin --loss 0.1
//! reno-transfer send --server 127.0.0.1:12345 --synthetic 10000 --history cwnd.csv
//! ```
//!
//! Set `RUST_LOG` to control verbosity (`debug` shows every frame).

use std::fs::File;
use std::io::{BufWriter, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use reno_protocol::prelude::*;

/// Reliable encrypted transfer over UDP with Reno congestion control.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Accept one connection and write the delivered bytes to a file.
    Receive {
        /// Local address to bind.
        #[arg(short, long, default_value = "127.0.0.1:12345")]
        bind: SocketAddr,

        /// File receiving the delivered bytes.
        #[arg(short, long, default_value = "received.bin")]
        output: PathBuf,

        /// Probability of dropping each inbound datagram.
        #[arg(long, default_value_t = 0.0)]
        loss: f64,

        /// Seed for the loss simulator.
        #[arg(long)]
        seed: Option<u64>,

        /// Seconds of silence after the handshake before giving up.
        #[arg(long, default_value_t = 60)]
        idle_secs: u64,

        /// Socket receive buffer in bytes.
        #[arg(long, default_value_t = RECV_BUFFER_SIZE)]
        recv_buffer: usize,
    },
    /// Connect to a receiver and send a file or a synthetic workload.
    Send {
        /// Receiver address.
        #[arg(short, long, default_value = "127.0.0.1:12345")]
        server: SocketAddr,

        /// File to send, split into segment-sized records.
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Number of synthetic records to send when no input file is given.
        #[arg(long, default_value_t = 1000)]
        synthetic: usize,

        /// Receive timeout in milliseconds.
        #[arg(long, default_value_t = 500)]
        timeout_ms: u64,

        /// SYN retransmissions before giving up.
        #[arg(long, default_value_t = 0)]
        handshake_retries: u32,

        /// Write the congestion window history here (`.json` or CSV).
        #[arg(long)]
        history: Option<PathBuf>,

        /// Socket receive buffer in bytes.
        #[arg(long, default_value_t = RECV_BUFFER_SIZE)]
        recv_buffer: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().mode {
        Mode::Receive {
            bind,
            output,
            loss,
            seed,
            idle_secs,
            recv_buffer,
        } => {
            let channel = UdpChannelBuilder::new()
                .recv_buffer_size(recv_buffer)
                .bind(bind)
                .await
                .with_context(|| format!("binding {bind}"))?;
            log::info!("listening on {}", channel.local_addr()?);

            let config = ReceiverConfigBuilder::new()
                .idle_timeout(Duration::from_secs(idle_secs))
                .build();
            let sink = BufWriter::new(
                File::create(&output).with_context(|| format!("creating {}", output.display()))?,
            );

            match simulate_loss(channel, loss, seed)? {
                Loss::Simulated(channel) => {
                    log::info!("simulating {:.0}% inbound loss", loss * 100.0);
                    receive(channel, config, sink).await
                }
                Loss::None(channel) => receive(channel, config, sink).await,
            }
        }
        Mode::Send {
            server,
            input,
            synthetic,
            timeout_ms,
            handshake_retries,
            history,
            recv_buffer,
        } => {
            let config = SenderConfigBuilder::new()
                .recv_timeout(Duration::from_millis(timeout_ms))
                .handshake_retries(handshake_retries)
                .build();

            let records = match &input {
                Some(path) => {
                    let bytes = std::fs::read(path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    chunk_records(&bytes, config.mss)
                }
                None => synthetic_records(synthetic),
            };

            let mut channel = UdpChannelBuilder::new()
                .recv_buffer_size(recv_buffer)
                .bind("0.0.0.0:0".parse()?)
                .await?;
            channel.connect(server);

            log::info!("connecting to {server}");
            let sender = Sender::connect(channel, TokenCipher::generate(), config).await?;
            let report = sender.transfer(records).await?;

            log::info!(
                "sent {} records in {:.2}s: {} retransmissions, {} fast retransmits, {} timeouts",
                report.frames_sent,
                report.elapsed.as_secs_f64(),
                report.retransmissions,
                report.fast_retransmits,
                report.timeouts
            );
            if let Some(peak) = report.history.max_cwnd() {
                log::info!("peak congestion window {peak:.2} packets");
            }

            if let Some(path) = history {
                write_history(&report.history, &path)?;
                log::info!("window history written to {}", path.display());
            }
            Ok(())
        }
    }
}

/// The receive-side channel, with or without a loss simulator in front.
enum Loss<T> {
    None(T),
    Simulated(LossyChannel<T>),
}

/// Wrap `channel` in a [`LossyChannel`] unless `loss` is exactly zero.
///
/// Any other value goes through [`LossyChannel`]'s range check, so a negative
/// or oversized probability is reported instead of ignored.
fn simulate_loss<T>(channel: T, loss: f64, seed: Option<u64>) -> Result<Loss<T>, ConfigError>
where
    T: DatagramChannel,
{
    if loss == 0.0 {
        return Ok(Loss::None(channel));
    }
    let channel = match seed {
        Some(seed) => LossyChannel::with_seed(channel, loss, seed)?,
        None => LossyChannel::new(channel, loss)?,
    };
    Ok(Loss::Simulated(channel))
}

async fn receive<T, W>(channel: T, config: ReceiverConfig, sink: W) -> anyhow::Result<()>
where
    T: DatagramChannel,
    W: Write,
{
    let receiver = Receiver::<_, TokenCipher>::bind(channel, config)?;
    let report = receiver.run(sink).await?;
    log::info!(
        "received {} records ({} bytes) in {:.2}s, {} duplicate ACKs, {} decrypt failures",
        report.delivered_records,
        report.delivered_bytes,
        report.elapsed.as_secs_f64(),
        report.duplicate_acks_sent,
        report.decrypt_failures
    );
    Ok(())
}

fn write_history(history: &WindowHistory, path: &Path) -> anyhow::Result<()> {
    let file = BufWriter::new(
        File::create(path).with_context(|| format!("creating {}", path.display()))?,
    );
    if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::to_writer_pretty(file, history)?;
    } else {
        history.write_csv(file)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_loss_rejected() {
        let (channel, _peer) = MemoryChannel::pair();
        let result = simulate_loss(channel, -0.5, Some(1));
        assert!(matches!(result, Err(ConfigError::LossProbability(p)) if p == -0.5));

        let (channel, _peer) = MemoryChannel::pair();
        let result = simulate_loss(channel, 1.5, None);
        assert!(matches!(result, Err(ConfigError::LossProbability(p)) if p == 1.5));
    }

    #[test]
    fn test_zero_loss_skips_simulator() {
        let (channel, _peer) = MemoryChannel::pair();
        assert!(matches!(simulate_loss(channel, 0.0, None), Ok(Loss::None(_))));

        let (channel, _peer) = MemoryChannel::pair();
        assert!(matches!(simulate_loss(channel, 0.25, Some(3)), Ok(Loss::Simulated(_))));
    }

    #[test]
    fn test_cli_parses_negative_loss_and_buffer() {
        let cli = Cli::try_parse_from([
            "reno-transfer",
            "receive",
            "--loss=-0.1",
            "--recv-buffer",
            "4096",
        ])
        .unwrap();
        match cli.mode {
            Mode::Receive {
                loss, recv_buffer, ..
            } => {
                assert_eq!(loss, -0.1);
                assert_eq!(recv_buffer, 4096);
            }
            Mode::Send { .. } => panic!("expected receive mode"),
        }

        let cli = Cli::try_parse_from(["reno-transfer", "send"]).unwrap();
        match cli.mode {
            Mode::Send { recv_buffer, .. } => assert_eq!(recv_buffer, RECV_BUFFER_SIZE),
            Mode::Receive { .. } => panic!("expected send mode"),
        }
    }
}
