//! RTT and bandwidth samples, and the summary computed from them.
//!
//! RTT 和带宽样本，以及由它们计算出的汇总。

use std::{fmt, time::Duration};

/// One round-trip time measurement.
///
/// 一次往返时间测量。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RttSample {
    pub value: Duration,
}

impl RttSample {
    pub fn new(value: Duration) -> Self {
        Self { value }
    }

    /// The sample in milliseconds.
    pub fn as_millis_f64(&self) -> f64 {
        self.value.as_secs_f64() * 1_000.0
    }
}

/// Delivered throughput over one sampling interval.
///
/// 一个采样周期内的交付吞吐量。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandwidthSample {
    pub bits_per_sec: f64,
}

impl BandwidthSample {
    pub fn new(bits_per_sec: f64) -> Self {
        Self { bits_per_sec }
    }

    /// Converts a delivered-bytes delta over `elapsed` into bits per second.
    ///
    /// 将 `elapsed` 内交付的字节增量换算为每秒比特数。
    pub fn from_delta(delivered_bytes: u64, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64();
        if secs <= 0.0 {
            return Self::new(0.0);
        }
        Self::new(delivered_bytes as f64 * 8.0 / secs)
    }

    pub fn kbits_per_sec(&self) -> f64 {
        self.bits_per_sec / 1_000.0
    }
}

/// Average of a bandwidth sample set, `None` if it is empty.
///
/// 带宽样本集的平均值，为空时返回 `None`。
pub fn average_bandwidth(samples: &[BandwidthSample]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let total: f64 = samples.iter().map(|s| s.bits_per_sec).sum();
    Some(total / samples.len() as f64)
}

/// Average, maximum and minimum of a set of RTT samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RttSummary {
    pub count: usize,
    pub average: Duration,
    pub maximum: Duration,
    pub minimum: Duration,
}

impl RttSummary {
    /// Summarizes the samples, `None` if there are none.
    pub fn from_samples(samples: &[RttSample]) -> Option<Self> {
        let first = samples.first()?.value;
        let mut total = Duration::ZERO;
        let mut maximum = first;
        let mut minimum = first;
        for sample in samples {
            total += sample.value;
            maximum = maximum.max(sample.value);
            minimum = minimum.min(sample.value);
        }
        Some(Self {
            count: samples.len(),
            average: total / samples.len() as u32,
            maximum,
            minimum,
        })
    }
}

/// The statistics published at the end of a run.
///
/// 运行结束时发布的统计结果。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub rtt: Option<RttSummary>,
    /// Average delivered bandwidth, bits per second.
    pub average_bandwidth_bps: f64,
    /// Bandwidth-delay product in bytes: the window that would keep the link
    /// busy at the measured rate. Informational only.
    ///
    /// 带宽时延积（字节）：以测得速率保持链路繁忙所需的窗口。仅供参考。
    pub bdp_window_bytes: f64,
}

impl Summary {
    pub fn from_samples(rtt: &[RttSample], bandwidth: &[BandwidthSample]) -> Self {
        let rtt = RttSummary::from_samples(rtt);
        let average_bandwidth_bps = average_bandwidth(bandwidth).unwrap_or(0.0);
        let avg_rtt_secs = rtt.map_or(0.0, |r| r.average.as_secs_f64());
        Self {
            rtt,
            average_bandwidth_bps,
            bdp_window_bytes: avg_rtt_secs * average_bandwidth_bps / 8.0,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rtt {
            Some(rtt) => {
                let ms = |d: Duration| d.as_secs_f64() * 1_000.0;
                writeln!(f, "Samples:           {}", rtt.count)?;
                writeln!(f, "Average RTT:       {:.6} ms", ms(rtt.average))?;
                writeln!(f, "Maximum RTT:       {:.6} ms", ms(rtt.maximum))?;
                writeln!(f, "Minimum RTT:       {:.6} ms", ms(rtt.minimum))?;
            }
            None => writeln!(f, "No RTT samples recorded")?,
        }
        writeln!(
            f,
            "Average Bandwidth: {:.3} Kbits/s",
            self.average_bandwidth_bps / 1_000.0
        )?;
        write!(
            f,
            "Window estimate (bandwidth-delay product): {:.1} bytes",
            self.bdp_window_bytes
        )
    }
}
