//! The client driver: runs one complete probe over a frame channel.
//!
//! 客户端驱动：在一个帧通道上运行一次完整的探测。

use crate::{
    config::{Config, Variant},
    core::{
        search::{AdaptiveSearch, SearchStep},
        sender::{SenderShared, StopAndWait, TrialReport, WindowController, spawn_ack_intake},
        stats::Summary,
    },
    error::{Error, Result},
    transport::{FrameSink, FrameSource},
};
use std::sync::Arc;
use tracing::{debug, info};

/// The outcome of a complete probe.
///
/// 一次完整探测的结果。
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub variant: Variant,
    /// Window used for the reported run, in packets.
    pub window_packets: u32,
    /// Measurements of the adaptive search, empty when no search ran.
    pub search: Vec<SearchStep>,
    /// The reported run.
    pub trial: TrialReport,
    pub summary: Summary,
}

/// Runs the configured variant to completion.
///
/// The ack intake is spawned on `source` for the whole session. Stop-and-wait
/// runs once for the test duration; the sliding window either runs once at a
/// fixed window or searches first and then runs at the best window. The data
/// direction is closed when the run ends.
///
/// 运行所配置的模式直至完成。ACK接收任务在整个会话期间运行于 `source` 上。停等模式运行一次
/// 测试时长；滑动窗口要么以固定窗口运行一次，要么先搜索再以最佳窗口运行。运行结束时关闭数据方向。
pub async fn run_probe<K, S>(config: &Config, sink: K, source: S) -> Result<ProbeReport>
where
    K: FrameSink,
    S: FrameSource,
{
    config.validate()?;
    let probe = &config.probe;
    let shared = Arc::new(SenderShared::new(probe));
    let intake = spawn_ack_intake(source, shared.clone());
    info!(
        variant = %probe.variant,
        packet_size = probe.packet_size,
        receive_window = probe.receive_window,
        "Starting probe"
    );

    let result = match probe.variant {
        Variant::StopAndWait => {
            let mut sender = StopAndWait::new(sink, shared, config);
            let result = sender.run(probe.test_duration).await;
            close_quietly(sender.close().await);
            result.map(|trial| (Vec::new(), trial))
        }
        Variant::SlidingWindow => {
            let mut controller = WindowController::new(sink, shared, config);
            let result = match probe.fixed_window_packets {
                Some(window) => controller
                    .run_trial(window, probe.test_duration)
                    .await
                    .map(|trial| (Vec::new(), trial)),
                None => AdaptiveSearch::from_config(probe)
                    .run(&mut controller, probe.test_duration)
                    .await
                    .map(|(outcome, trial)| (outcome.steps, trial)),
            };
            close_quietly(controller.close().await);
            result
        }
    };

    intake.abort();
    let (search, trial) = match (result, intake.await) {
        // The run saw the connection close; the intake knows why.
        (Err(Error::ConnectionClosed), Ok(Err(cause))) => return Err(cause),
        (result, _) => result?,
    };

    let summary = Summary::from_samples(&trial.rtt_samples, &trial.bandwidth_samples);
    info!(
        window_packets = trial.window_packets,
        avg_kbits_per_sec = summary.average_bandwidth_bps / 1_000.0,
        "Probe finished"
    );
    Ok(ProbeReport {
        variant: probe.variant,
        window_packets: trial.window_packets,
        search,
        trial,
        summary,
    })
}

fn close_quietly(result: Result<()>) {
    if let Err(e) = result {
        debug!(error = %e, "Closing the data direction failed");
    }
}
