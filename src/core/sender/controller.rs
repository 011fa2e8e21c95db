//! The window controller: the sender's transmit path.
//!
//! One trial runs a fixed window for a bounded wall-clock duration. Each pass
//! of the loop folds the received acks into `max_ack`, acknowledges packets,
//! checks for a fast retransmission and for expired deadlines, then fills the
//! window from the pending queue. When the window is full the controller
//! sleeps until the ack intake or the timeout scanner wakes it, or until the
//! trial ends.
//!
//! 窗口控制器：发送端的发送路径。
//!
//! 一次试验在有界的时长内以固定窗口运行。循环的每一轮将收到的ACK合并进 `max_ack`，
//! 确认数据包，检查快速重传和超时，然后从待发队列填满窗口。窗口满时控制器休眠，
//! 直到ACK接收或超时扫描器将其唤醒，或者试验结束。

use super::{
    PendingPacket, SenderShared, TrialReport,
    scanner::{ScannerReport, run_timeout_scanner},
};
use crate::{
    config::{Config, ReliabilityConfig},
    core::search::TrialRunner,
    error::{Error, Result},
    packet::frame::Frame,
    transport::FrameSink,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::oneshot,
    time::{Instant, sleep_until},
};
use tracing::{debug, info};

/// Drives sliding-window trials over one frame sink.
///
/// 在一个帧发送端上驱动滑动窗口试验。
pub struct WindowController<K> {
    sink: K,
    shared: Arc<SenderShared>,
    reliability: ReliabilityConfig,
    packet_size: u32,
    sample_interval: Duration,
    /// Placeholder payload shared by every data frame.
    payload: Bytes,
}

impl<K: FrameSink> WindowController<K> {
    pub fn new(sink: K, shared: Arc<SenderShared>, config: &Config) -> Self {
        Self {
            sink,
            shared,
            reliability: config.reliability.clone(),
            packet_size: config.probe.packet_size,
            sample_interval: config.probe.bandwidth_sample_interval,
            payload: Bytes::from(vec![0u8; config.probe.packet_size as usize]),
        }
    }

    /// Runs one trial with a window of `window_packets` packets.
    ///
    /// The timeout scanner runs alongside for the duration of the trial and
    /// its bandwidth samples are returned in the report.
    ///
    /// 以 `window_packets` 个包的窗口运行一次试验。超时扫描器在试验期间并行运行，
    /// 其带宽样本随报告返回。
    pub async fn run_trial(
        &mut self,
        window_packets: u32,
        duration: Duration,
    ) -> Result<TrialReport> {
        let window_bytes = window_packets.saturating_mul(self.packet_size);
        self.shared.window.lock().await.begin_trial();
        info!(window_packets, window_bytes, ?duration, "Starting trial");

        let (stop_tx, stop_rx) = oneshot::channel();
        let scanner = tokio::spawn(run_timeout_scanner(
            self.shared.clone(),
            self.reliability.timeout_poll_interval,
            self.sample_interval,
            stop_rx,
        ));

        let mut report = TrialReport {
            window_packets,
            ..TrialReport::default()
        };
        let outcome = self
            .drive(window_bytes, Instant::now() + duration, &mut report)
            .await;

        // The receiver may already be gone; the scanner stops either way.
        let _ = stop_tx.send(());
        let ScannerReport {
            bandwidth_samples,
            timeouts,
        } = scanner.await?;
        report.bandwidth_samples = bandwidth_samples;
        report.retransmits.timeout += timeouts;
        outcome?;

        info!(
            window_packets,
            packets_sent = report.packets_sent,
            rtt_samples = report.rtt_samples.len(),
            fast_retransmits = report.retransmits.fast,
            timeouts = report.retransmits.timeout,
            "Trial finished"
        );
        Ok(report)
    }

    async fn drive(
        &mut self,
        window_bytes: u32,
        end: Instant,
        report: &mut TrialReport,
    ) -> Result<()> {
        while Instant::now() < end {
            let batch = self.service_window(window_bytes, report).await?;
            if batch.is_empty() {
                tokio::select! {
                    _ = self.shared.wake.notified() => {}
                    _ = sleep_until(end) => break,
                }
                continue;
            }
            self.transmit(batch, report).await?;
        }
        Ok(())
    }

    /// One bookkeeping pass under the queue lock. Returns the packets the
    /// window admits; empty means the window is full.
    async fn service_window(
        &mut self,
        window_bytes: u32,
        report: &mut TrialReport,
    ) -> Result<Vec<PendingPacket>> {
        let mut window = self.shared.window.lock().await;
        if window.is_closed() {
            return Err(Error::ConnectionClosed);
        }

        let now = Instant::now();
        window.update_max_ack();
        let acked = window.process_acks(now);
        // Queue region is held: counter second.
        self.shared.add_delivered(acked.delivered_bytes).await;
        report.rtt_samples.extend(acked.rtt_samples);

        if window
            .fast_retransmit(self.reliability.fast_retx_threshold)
            .is_some()
        {
            report.retransmits.fast += 1;
        }
        report.retransmits.timeout += window.expire(now).len() as u32;

        Ok(window.take_sendable(window_bytes))
    }

    async fn transmit(
        &mut self,
        batch: Vec<PendingPacket>,
        report: &mut TrialReport,
    ) -> Result<()> {
        let mut sent = Vec::with_capacity(batch.len());
        for packet in batch {
            let frame = Frame::new_data(packet.seq_num, self.payload.clone());
            self.sink.send_frame(&frame).await?;
            debug!(
                seq = packet.seq_num,
                retransmitted = packet.retransmitted,
                "Data frame sent"
            );
            sent.push((packet, Instant::now()));
        }
        report.packets_sent += sent.len() as u64;

        let mut window = self.shared.window.lock().await;
        for (packet, sent_time) in sent {
            window.mark_in_flight(packet, sent_time, self.reliability.rto);
        }
        Ok(())
    }

    /// Closes the data direction of the connection.
    pub async fn close(&mut self) -> Result<()> {
        self.sink.close().await
    }
}

#[async_trait]
impl<K: FrameSink> TrialRunner for WindowController<K> {
    async fn run_trial(&mut self, window_packets: u32, duration: Duration) -> Result<TrialReport> {
        WindowController::run_trial(self, window_packets, duration).await
    }
}
