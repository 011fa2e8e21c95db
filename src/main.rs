//! Entry point for `window-probe`.
//!
//! Parses CLI arguments and dispatches into either **server** or **client**
//! mode. All protocol work lives in the library; this file owns process setup
//! (logging, argument parsing) and printing the results.

use clap::{Parser, Subcommand};
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    process::ExitCode,
    time::Duration,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use window_probe::{
    config::{Config, Variant},
    error::Result,
    probe::{ProbeReport, run_probe},
    report::write_rtt_samples,
    server::Server,
    transport::tcp,
};

/// Measures RTT and delivered bandwidth of a link with a window-based probe.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Run the receiver, acknowledging every probe connection.
    Server {
        /// Port to listen on, on all interfaces.
        port: Option<u16>,
        /// Full address to bind; overrides the port.
        #[arg(short, long)]
        bind: Option<SocketAddr>,
        /// Bytes of out-of-order frames buffered per connection.
        #[arg(long, default_value_t = 65_536)]
        budget: u32,
    },
    /// Run the probe against a receiver.
    Client {
        /// Receiver IP address.
        #[arg(short = 'd', long = "dst")]
        dst: IpAddr,
        /// Receiver port.
        #[arg(short = 'p', long = "port")]
        port: u16,
        /// Local source port to bind before connecting.
        #[arg(short = 's', long = "src-port")]
        src_port: Option<u16>,
        /// Payload bytes per data frame.
        #[arg(short = 'z', long, default_value_t = 1460)]
        packet_size: u32,
        /// Length of the reported run, in seconds.
        #[arg(short = 't', long, default_value_t = 5)]
        duration: u64,
        /// `saw` (stop-and-wait) or `swf` (sliding window).
        #[arg(short = 'v', long, default_value = "saw")]
        variant: Variant,
        /// Retransmission timeout in milliseconds.
        #[arg(long, default_value_t = 3_000)]
        rto_ms: u64,
        /// Fixed window in packets; skips the window search.
        #[arg(long)]
        window: Option<u32>,
        /// Peer receive window in bytes.
        #[arg(long, default_value_t = 65_535)]
        rwnd: u32,
        /// File receiving the RTT samples of the reported run.
        #[arg(short, long, default_value = "tcprtt.txt")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // RUST_LOG controls verbosity.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("window_probe=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let result = match cli.mode {
        Mode::Server { port, bind, budget } => {
            let addr = bind.unwrap_or_else(|| {
                SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port.unwrap_or(9000))
            });
            run_server(addr, budget).await
        }
        Mode::Client {
            dst,
            port,
            src_port,
            packet_size,
            duration,
            variant,
            rto_ms,
            window,
            rwnd,
            output,
        } => {
            let mut config = Config::default();
            config.reliability.rto = Duration::from_millis(rto_ms);
            config.probe.variant = variant;
            config.probe.packet_size = packet_size;
            config.probe.receive_window = rwnd;
            config.probe.test_duration = Duration::from_secs(duration);
            config.probe.fixed_window_packets = window;
            config.probe.rtt_output_path = output;
            run_client(config, SocketAddr::new(dst, port), src_port).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "window-probe failed");
            ExitCode::FAILURE
        }
    }
}

async fn run_server(addr: SocketAddr, budget: u32) -> Result<()> {
    let mut config = Config::default().receiver;
    config.receive_window_budget = budget;
    Server::bind(addr, config).await?.serve().await
}

async fn run_client(config: Config, remote: SocketAddr, src_port: Option<u16>) -> Result<()> {
    config.validate()?;
    let stream = tcp::connect(remote, src_port).await?;
    let (sink, source) = tcp::split(stream);

    let report = run_probe(&config, sink, source).await?;
    write_rtt_samples(&config.probe.rtt_output_path, &report.trial.rtt_samples).await?;
    info!(
        path = %config.probe.rtt_output_path.display(),
        samples = report.trial.rtt_samples.len(),
        "RTT samples written"
    );
    print_report(&report);
    Ok(())
}

fn print_report(report: &ProbeReport) {
    println!("\n***** TEST RESULTS *****");
    println!("Variant:           {}", report.variant);
    for step in &report.search {
        println!(
            "Search window {:>4} packets: {:.3} Kbits/s",
            step.window_packets,
            step.average_bandwidth_bps / 1_000.0
        );
    }
    println!("Window:            {} packets", report.window_packets);
    println!(
        "Packets sent:      {} ({} fast retransmits, {} timeouts)",
        report.trial.packets_sent,
        report.trial.retransmits.fast,
        report.trial.retransmits.timeout
    );
    println!("{}", report.summary);
}
