//! The timeout scanner: a background task that walks the in-flight set once
//! per poll interval and samples delivered bandwidth once per sample interval.
//!
//! 超时扫描器：后台任务，每个轮询周期遍历一次在途集合，每个采样周期采样一次交付带宽。

use super::SenderShared;
use crate::core::stats::BandwidthSample;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::oneshot,
    time::{Instant, MissedTickBehavior, interval},
};
use tracing::{debug, trace};

/// What the scanner observed during one trial.
#[derive(Debug, Default)]
pub struct ScannerReport {
    pub bandwidth_samples: Vec<BandwidthSample>,
    /// Packets requeued because their deadline elapsed.
    pub timeouts: u32,
}

/// Runs until `stop` fires (or its sender is dropped).
///
/// Expired packets go back to the head of the pending queue and the
/// controller is woken. Bandwidth is the delta of the delivered-bytes counter
/// since the previous sample, converted to bits per second.
///
/// 运行直到 `stop` 触发（或其发送端被丢弃）。超时的包被放回待发队列队首并唤醒控制器。
/// 带宽为交付字节计数器相对上次采样的增量，换算为每秒比特数。
pub async fn run_timeout_scanner(
    shared: Arc<SenderShared>,
    poll_interval: Duration,
    sample_interval: Duration,
    mut stop: oneshot::Receiver<()>,
) -> ScannerReport {
    let mut report = ScannerReport::default();
    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut last_sample_at = Instant::now();
    let mut last_delivered = shared.delivered_bytes().await;

    loop {
        tokio::select! {
            _ = &mut stop => break,
            _ = ticker.tick() => {}
        }

        let now = Instant::now();
        let expired = shared.window.lock().await.expire(now);
        if !expired.is_empty() {
            report.timeouts += expired.len() as u32;
            shared.wake.notify_one();
        }

        let elapsed = now.saturating_duration_since(last_sample_at);
        if elapsed >= sample_interval {
            let delivered = shared.delivered_bytes().await;
            let sample =
                BandwidthSample::from_delta(delivered.saturating_sub(last_delivered), elapsed);
            trace!(kbits_per_sec = sample.kbits_per_sec(), "Bandwidth sample");
            report.bandwidth_samples.push(sample);
            last_delivered = delivered;
            last_sample_at = now;
        }
    }

    debug!(
        samples = report.bandwidth_samples.len(),
        timeouts = report.timeouts,
        "Timeout scanner stopped"
    );
    report
}
