//! Stop-and-wait: one packet in flight at a time.
//!
//! 停等模式：同一时间只有一个在途数据包。

use super::{
    SenderShared, TrialReport,
    scanner::{ScannerReport, run_timeout_scanner},
};
use crate::{
    config::{Config, ReliabilityConfig},
    core::stats::RttSample,
    error::{Error, Result},
    packet::frame::Frame,
    transport::FrameSink,
};
use bytes::Bytes;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::oneshot,
    time::{Instant, sleep_until},
};
use tracing::{debug, info, warn};

/// Sends one data frame, waits for the ack that covers it, then moves on.
pub struct StopAndWait<K> {
    sink: K,
    shared: Arc<SenderShared>,
    reliability: ReliabilityConfig,
    packet_size: u32,
    sample_interval: Duration,
    payload: Bytes,
}

impl<K: FrameSink> StopAndWait<K> {
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

    /// Runs for `duration`, delivering one packet after another.
    ///
    /// A packet that is still unacknowledged after
    /// `stop_and_wait_max_retries` transmissions fails the run with
    /// [`Error::RetriesExhausted`].
    ///
    /// 运行 `duration` 时长，逐个交付数据包。某个包在发送
    /// `stop_and_wait_max_retries` 次后仍未被确认，则以 [`Error::RetriesExhausted`] 失败。
    pub async fn run(&mut self, duration: Duration) -> Result<TrialReport> {
        let mut seq_num = {
            let mut window = self.shared.window.lock().await;
            window.begin_trial();
            window.max_ack()
        };
        info!(first_seq = seq_num, ?duration, "Starting stop-and-wait run");

        let (stop_tx, stop_rx) = oneshot::channel();
        let scanner = tokio::spawn(run_timeout_scanner(
            self.shared.clone(),
            self.reliability.timeout_poll_interval,
            self.sample_interval,
            stop_rx,
        ));

        let mut report = TrialReport {
            window_packets: 1,
            ..TrialReport::default()
        };
        let end = Instant::now() + duration;
        let mut outcome = Ok(());
        while Instant::now() < end {
            if let Err(e) = self.deliver(seq_num, &mut report).await {
                outcome = Err(e);
                break;
            }
            seq_num = seq_num.wrapping_add(1);
        }

        let _ = stop_tx.send(());
        let ScannerReport {
            bandwidth_samples, ..
        } = scanner.await?;
        report.bandwidth_samples = bandwidth_samples;
        outcome?;

        info!(
            packets_sent = report.packets_sent,
            delivered = report.rtt_samples.len(),
            retransmits = report.retransmits.timeout,
            "Stop-and-wait run finished"
        );
        Ok(report)
    }

    /// Transmits `seq_num` until it is acknowledged or the retries run out.
    async fn deliver(&mut self, seq_num: u32, report: &mut TrialReport) -> Result<()> {
        let frame = Frame::new_data(seq_num, self.payload.clone());
        let attempts = self.reliability.stop_and_wait_max_retries.max(1);
        let first_sent = Instant::now();

        for attempt in 1..=attempts {
            if attempt > 1 {
                report.retransmits.timeout += 1;
                warn!(seq = seq_num, attempt, "Retransmitting");
            }
            self.sink.send_frame(&frame).await?;
            report.packets_sent += 1;

            let deadline = Instant::now() + self.reliability.rto;
            if self.await_ack(seq_num, deadline).await? {
                let rtt = first_sent.elapsed();
                debug!(seq = seq_num, ?rtt, "Packet acknowledged");
                report.rtt_samples.push(RttSample::new(rtt));
                self.shared.add_delivered(u64::from(self.packet_size)).await;
                return Ok(());
            }
        }

        Err(Error::RetriesExhausted { seq_num, attempts })
    }

    /// Waits for the next batch of acks. `Ok(true)` if one of them covers
    /// `seq_num`, `Ok(false)` if they do not or the deadline passes first.
    async fn await_ack(&self, seq_num: u32, deadline: Instant) -> Result<bool> {
        loop {
            let events = {
                let mut window = self.shared.window.lock().await;
                let events = window.take_ack_events();
                if events.is_empty() && window.is_closed() {
                    return Err(Error::ConnectionClosed);
                }
                events
            };
            if !events.is_empty() {
                // An echoed sequence number and a next-expected ack both cover it.
                return Ok(events.iter().any(|e| e.ack_num >= seq_num));
            }

            tokio::select! {
                _ = self.shared.wake.notified() => {}
                _ = sleep_until(deadline) => return Ok(false),
            }
        }
    }

    /// Closes the data direction of the connection.
    pub async fn close(&mut self) -> Result<()> {
        self.sink.close().await
    }
}
