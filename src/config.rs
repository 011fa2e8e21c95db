//! 定义了探测器、发送端和接收端的可配置参数。
//! Defines configurable parameters for the prober, the sender and the receiver.

use crate::error::{Error, Result};
use std::{fmt, path::PathBuf, str::FromStr, time::Duration};

/// Selects how the client drives the link.
///
/// 选择客户端驱动链路的方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    /// One packet in flight at a time, retried on timeout.
    /// 每次只有一个在途数据包，超时重试。
    #[default]
    StopAndWait,
    /// The full sliding-window engine, with adaptive window search.
    /// 完整的滑动窗口引擎，带自适应窗口搜索。
    SlidingWindow,
}

impl FromStr for Variant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "saw" | "stop-and-wait" => Ok(Variant::StopAndWait),
            "swf" | "sliding-window" => Ok(Variant::SlidingWindow),
            _ => Err(Error::InvalidConfig(
                "variant must be `saw` (stop-and-wait) or `swf` (sliding window)",
            )),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::StopAndWait => f.write_str("stop-and-wait"),
            Variant::SlidingWindow => f.write_str("sliding-window"),
        }
    }
}

/// A structure containing all configurable parameters.
///
/// 包含所有可配置参数的结构体。
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Retransmission-related parameters.
    /// 重传相关参数。
    pub reliability: ReliabilityConfig,

    /// Parameters of the throughput probe run by the client.
    /// 客户端吞吐量探测的参数。
    pub probe: ProbeConfig,

    /// Parameters of the receiving side.
    /// 接收端参数。
    pub receiver: ReceiverConfig,
}

/// Retransmission-related parameters.
///
/// 重传相关参数。
#[derive(Debug, Clone)]
pub struct ReliabilityConfig {
    /// Time after which an unacknowledged packet is requeued.
    /// 未确认数据包被重新排队前的超时时间。
    pub rto: Duration,
    /// Number of acks naming the oldest in-flight packet that trigger a fast
    /// retransmission.
    /// 触发快速重传所需的、指向最旧在途包的ACK数量。
    pub fast_retx_threshold: u32,
    /// How often the timeout scanner walks the in-flight set.
    /// 超时扫描器遍历在途集合的周期。
    pub timeout_poll_interval: Duration,
    /// Retries allowed for a single stop-and-wait packet before giving up.
    /// 停等模式下单个数据包放弃前允许的重试次数。
    pub stop_and_wait_max_retries: u8,
}

/// Parameters of the throughput probe.
///
/// 吞吐量探测参数。
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Which variant to run.
    /// 运行哪种模式。
    pub variant: Variant,
    /// Size in bytes of every placeholder payload.
    /// 每个占位载荷的字节数。
    pub packet_size: u32,
    /// The peer's receive window in bytes. Bounds the window search and sizes
    /// the seeded pending queue.
    /// 对端接收窗口（字节）。限制窗口搜索范围并决定初始待发队列长度。
    pub receive_window: u32,
    /// Length of the final (reported) run.
    /// 最终（上报）运行的时长。
    pub test_duration: Duration,
    /// Length of each trial during the adaptive window search.
    /// 自适应窗口搜索中每次试验的时长。
    pub search_trial_duration: Duration,
    /// Window increment, in packets, between two search trials.
    /// 两次搜索试验之间的窗口增量（以包为单位）。
    pub search_step_packets: u32,
    /// Period of the bandwidth sampler.
    /// 带宽采样周期。
    pub bandwidth_sample_interval: Duration,
    /// Skips the search and runs a single trial with this window.
    /// 跳过搜索，直接以此窗口运行一次试验。
    pub fixed_window_packets: Option<u32>,
    /// Where the final run's RTT samples are written.
    /// 最终运行的RTT样本写入位置。
    pub rtt_output_path: PathBuf,
}

/// Parameters of the receiving side.
///
/// 接收端参数。
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Bytes of out-of-order frames a connection may hold.
    /// 每个连接可缓存的乱序帧字节数。
    pub receive_window_budget: u32,
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            rto: Duration::from_secs(3),
            fast_retx_threshold: 3,
            timeout_poll_interval: Duration::from_millis(1),
            stop_and_wait_max_retries: 5,
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            variant: Variant::default(),
            packet_size: 1460,
            receive_window: 65535,
            test_duration: Duration::from_secs(5),
            search_trial_duration: Duration::from_secs(3),
            search_step_packets: 5,
            bandwidth_sample_interval: Duration::from_secs(1),
            fixed_window_packets: None,
            rtt_output_path: PathBuf::from("tcprtt.txt"),
        }
    }
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            receive_window_budget: 65536,
        }
    }
}

impl ProbeConfig {
    /// Largest window, in packets, the peer's receive window can hold.
    ///
    /// 对端接收窗口可容纳的最大窗口（以包为单位）。
    pub fn max_window_packets(&self) -> u32 {
        self.receive_window / self.packet_size.max(1)
    }

    /// Number of placeholder packets scheduled at the start of a trial.
    pub fn seed_packet_count(&self) -> u32 {
        2 * self.max_window_packets()
    }
}

impl Config {
    /// Checks that the parameters can drive a probe.
    ///
    /// 检查参数是否能够驱动探测。
    pub fn validate(&self) -> Result<()> {
        let probe = &self.probe;
        if probe.packet_size == 0 {
            return Err(Error::InvalidConfig("packet size must be non-zero"));
        }
        if probe.max_window_packets() == 0 {
            return Err(Error::InvalidConfig(
                "receive window must hold at least one packet",
            ));
        }
        if probe.search_step_packets == 0 {
            return Err(Error::InvalidConfig("search step must be non-zero"));
        }
        if let Some(0) = probe.fixed_window_packets {
            return Err(Error::InvalidConfig("fixed window must be non-zero"));
        }
        if probe.test_duration.is_zero() || probe.search_trial_duration.is_zero() {
            return Err(Error::InvalidConfig("trial durations must be non-zero"));
        }
        if probe.bandwidth_sample_interval.is_zero() {
            return Err(Error::InvalidConfig(
                "bandwidth sample interval must be non-zero",
            ));
        }
        if self.reliability.rto.is_zero() || self.reliability.timeout_poll_interval.is_zero() {
            return Err(Error::InvalidConfig(
                "retransmission timeout and poll interval must be non-zero",
            ));
        }
        if self.reliability.fast_retx_threshold == 0 {
            return Err(Error::InvalidConfig("fast retransmit threshold must be non-zero"));
        }
        Ok(())
    }
}
