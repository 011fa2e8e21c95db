//! 测试辅助工具模块
//! Test utilities module

use crate::{
    config::{Config, ProbeConfig, Variant},
    core::receiver::ReceiverStats,
    error::Result,
    packet::frame::Frame,
    server::serve_connection,
    transport::{FrameSink, StreamSink, StreamSource, framed},
};
use async_trait::async_trait;
use std::{
    sync::{
        Arc, Once,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::{
    io::{DuplexStream, ReadHalf, WriteHalf, duplex},
    task::JoinHandle,
};

pub type DuplexSink = StreamSink<WriteHalf<DuplexStream>>;
pub type DuplexSource = StreamSource<ReadHalf<DuplexStream>>;

/// Decides whether a frame is delivered. Return true to keep it.
pub type FrameFilter = Arc<dyn Fn(&Frame) -> bool + Send + Sync>;

/// Initializes tracing for tests, ensuring it's only done once.
pub fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        let filter =
            std::env::var("RUST_LOG").unwrap_or_else(|_| "window_probe=info".to_string());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// A sink wrapper that silently drops the frames its filter rejects,
/// simulating loss on the path.
pub struct DroppingSink<K> {
    inner: K,
    filter: FrameFilter,
    pub dropped: Arc<AtomicUsize>,
}

impl<K> DroppingSink<K> {
    pub fn new(inner: K, filter: FrameFilter) -> Self {
        Self {
            inner,
            filter,
            dropped: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl<K: FrameSink> FrameSink for DroppingSink<K> {
    async fn send_frame(&mut self, frame: &Frame) -> Result<()> {
        if !(self.filter)(frame) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }
        self.inner.send_frame(frame).await
    }

    async fn close(&mut self) -> Result<()> {
        self.inner.close().await
    }
}

/// Connects a client frame channel to an in-memory receiver session.
/// Returns the client halves and the session task.
pub fn spawn_receiver(
    budget: u32,
) -> (
    DuplexSink,
    DuplexSource,
    JoinHandle<Result<ReceiverStats>>,
) {
    let (client, server) = duplex(1 << 20);
    let (sink, source) = framed(client);
    let (server_sink, server_source) = framed(server);
    let session = tokio::spawn(serve_connection(server_source, server_sink, budget));
    (sink, source, session)
}

/// A configuration with timings small enough for real-time tests.
pub fn fast_config(variant: Variant) -> Config {
    let mut config = Config::default();
    config.reliability.rto = Duration::from_millis(200);
    config.probe = ProbeConfig {
        variant,
        packet_size: 100,
        receive_window: 2_000,
        test_duration: Duration::from_millis(600),
        search_trial_duration: Duration::from_millis(250),
        search_step_packets: 5,
        bandwidth_sample_interval: Duration::from_millis(100),
        ..ProbeConfig::default()
    };
    config
}
