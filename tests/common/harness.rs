//! tests/common/harness.rs
use std::{net::SocketAddr, sync::Once, time::Duration};
use tokio::task::JoinHandle;
use window_probe::{
    config::{Config, ProbeConfig, ReceiverConfig, Variant},
    server::Server,
    transport::tcp::{self, TcpFrameSink, TcpFrameSource},
};

/// Initializes tracing for tests, ensuring it's only done once.
pub fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        let filter =
            std::env::var("RUST_LOG").unwrap_or_else(|_| "window_probe=debug".to_string());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}

/// A receiver listening on an ephemeral loopback port.
pub struct TestHarness {
    pub server_addr: SocketAddr,
    server: JoinHandle<window_probe::error::Result<()>>,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_config(ReceiverConfig::default()).await
    }

    pub async fn with_config(config: ReceiverConfig) -> Self {
        init_tracing();
        let server = Server::bind("127.0.0.1:0".parse().unwrap(), config)
            .await
            .unwrap();
        let server_addr = server.local_addr().unwrap();
        Self {
            server_addr,
            server: tokio::spawn(server.serve()),
        }
    }

    /// Opens a client connection to the receiver.
    pub async fn connect(&self) -> (TcpFrameSink, TcpFrameSource) {
        let stream = tcp::connect(self.server_addr, None).await.unwrap();
        tcp::split(stream)
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// A configuration with timings small enough for real-time tests.
pub fn quick_config(variant: Variant) -> Config {
    let mut config = Config::default();
    config.reliability.rto = Duration::from_millis(300);
    config.probe = ProbeConfig {
        variant,
        packet_size: 512,
        receive_window: 8_192,
        test_duration: Duration::from_millis(600),
        search_trial_duration: Duration::from_millis(250),
        search_step_packets: 5,
        bandwidth_sample_interval: Duration::from_millis(100),
        ..ProbeConfig::default()
    };
    config
}
