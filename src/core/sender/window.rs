//! The queue region of the sender: pending packets, in-flight packets, and
//! the acknowledgment events delivered by the ack intake.
//!
//! Packets move pending -> in-flight -> acknowledged. A fast retransmission or
//! an expired deadline moves an in-flight packet back to the *head* of the
//! pending queue so it is retried before any newer data.
//!
//! 发送端的队列区域：待发数据包、在途数据包以及ACK接收路径交付的确认事件。
//!
//! 数据包的生命周期为 待发 -> 在途 -> 已确认。快速重传或超时会把在途包放回待发队列的
//! *队首*，使其先于任何新数据被重发。

use crate::core::{INITIAL_SEQUENCE, stats::RttSample};
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

/// A packet scheduled but not yet transmitted.
///
/// 已调度但尚未发送的数据包。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingPacket {
    pub seq_num: u32,
    pub length: u32,
    pub retransmitted: bool,
}

/// A packet that has been sent but not yet acknowledged.
///
/// 已发送但尚未被确认的数据包。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InFlightPacket {
    pub seq_num: u32,
    pub length: u32,
    pub sent_time: Instant,
    pub deadline: Instant,
    pub retransmitted: bool,
    pub duplicate_ack_count: u32,
}

impl InFlightPacket {
    fn requeue(&self) -> PendingPacket {
        PendingPacket {
            seq_num: self.seq_num,
            length: self.length,
            retransmitted: true,
        }
    }
}

/// An acknowledgment number received from the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckEvent {
    pub ack_num: u32,
}

/// Result of one pass of the acknowledgment processor.
///
/// 确认处理器一次处理的结果。
#[derive(Debug, Default)]
pub struct AckOutcome {
    pub rtt_samples: Vec<RttSample>,
    pub acked_packets: u32,
    pub delivered_bytes: u64,
}

/// Pending queue, in-flight set, and ack intake of one sender session.
#[derive(Debug)]
pub struct SendWindow {
    pending: VecDeque<PendingPacket>,
    /// Ordered by sequence number; the first entry is the oldest unacknowledged.
    in_flight: BTreeMap<u32, InFlightPacket>,
    ack_events: Vec<AckEvent>,
    max_ack: u32,
    unacked_bytes: u32,
    /// Sequence number given to the next freshly scheduled packet.
    next_seq: u32,
    packet_size: u32,
    batch_size: u32,
    closed: bool,
}

impl SendWindow {
    /// Creates an empty window. `batch_size` packets are scheduled whenever
    /// the pending queue runs dry.
    pub fn new(packet_size: u32, batch_size: u32) -> Self {
        Self {
            pending: VecDeque::new(),
            in_flight: BTreeMap::new(),
            ack_events: Vec::new(),
            max_ack: INITIAL_SEQUENCE,
            unacked_bytes: 0,
            next_seq: INITIAL_SEQUENCE,
            packet_size,
            batch_size: batch_size.max(1),
            closed: false,
        }
    }

    /// Resets the per-trial state.
    ///
    /// Ack events left over from the previous trial are folded into
    /// `max_ack`, queues are cleared, and numbering resumes at `max_ack`, the
    /// first sequence the receiver is still waiting for.
    ///
    /// 重置每次试验的状态。上一次试验遗留的ACK事件被合并进 `max_ack`，队列被清空，
    /// 序号从 `max_ack` 继续，即接收端仍在等待的第一个序号。
    pub fn begin_trial(&mut self) {
        self.update_max_ack();
        self.ack_events.clear();
        self.pending.clear();
        self.in_flight.clear();
        self.unacked_bytes = 0;
        self.next_seq = self.max_ack;
        self.schedule_batch();
        debug!(
            first_seq = self.max_ack,
            scheduled = self.pending.len(),
            "Trial state reset"
        );
    }

    /// Appends a batch of placeholder packets to the pending queue.
    fn schedule_batch(&mut self) {
        for _ in 0..self.batch_size {
            self.pending.push_back(PendingPacket {
                seq_num: self.next_seq,
                length: self.packet_size,
                retransmitted: false,
            });
            self.next_seq = self.next_seq.wrapping_add(1);
        }
    }

    /// Records an acknowledgment number received from the peer.
    pub fn push_ack(&mut self, ack_num: u32) {
        self.ack_events.push(AckEvent { ack_num });
    }

    /// Folds the queued ack events into `max_ack`, which never decreases.
    /// The events stay queued for the fast retransmit detector.
    ///
    /// 将排队的ACK事件合并进 `max_ack`（只增不减）。事件保留给快速重传检测器使用。
    pub fn update_max_ack(&mut self) -> u32 {
        if let Some(highest) = self.ack_events.iter().map(|e| e.ack_num).max() {
            self.max_ack = self.max_ack.max(highest);
        }
        self.max_ack
    }

    /// Updates `max_ack` and hands every queued ack event to the caller.
    pub fn take_ack_events(&mut self) -> Vec<AckEvent> {
        self.update_max_ack();
        std::mem::take(&mut self.ack_events)
    }

    /// Cumulative acknowledgment: every in-flight packet below `max_ack` is
    /// acknowledged, yields one RTT sample, and stops counting against the
    /// window.
    ///
    /// 累积确认：所有序号小于 `max_ack` 的在途包都被确认，各产生一个RTT样本，
    /// 并不再占用窗口。
    pub fn process_acks(&mut self, now: Instant) -> AckOutcome {
        let still_in_flight = self.in_flight.split_off(&self.max_ack);
        let acked = std::mem::replace(&mut self.in_flight, still_in_flight);

        let mut outcome = AckOutcome::default();
        for packet in acked.into_values() {
            trace!(seq = packet.seq_num, "Packet acknowledged");
            outcome
                .rtt_samples
                .push(RttSample::new(now.saturating_duration_since(packet.sent_time)));
            outcome.acked_packets += 1;
            outcome.delivered_bytes += u64::from(packet.length);
            self.release(packet.length);
        }
        outcome
    }

    /// Fast retransmit detection.
    ///
    /// Every queued ack event equal to both `max_ack` and the oldest in-flight
    /// sequence number counts as a duplicate for that packet. Once the count
    /// reaches `threshold` the packet is pulled out of flight and requeued at
    /// the head of the pending queue. The ack events are consumed.
    ///
    /// 快速重传检测。每个同时等于 `max_ack` 和最旧在途序号的ACK事件都计为该包的一次
    /// 重复确认。计数达到 `threshold` 时，该包被移出在途集合并放回待发队列队首。
    /// ACK事件在此被消费。
    pub fn fast_retransmit(&mut self, threshold: u32) -> Option<u32> {
        let events = std::mem::take(&mut self.ack_events);
        let max_ack = self.max_ack;
        let mut oldest = self.in_flight.first_entry()?;
        let packet = oldest.get_mut();

        for event in &events {
            if event.ack_num == max_ack && event.ack_num == packet.seq_num {
                packet.duplicate_ack_count += 1;
            }
        }
        if packet.duplicate_ack_count < threshold {
            return None;
        }

        let packet = oldest.remove();
        debug!(
            seq = packet.seq_num,
            duplicate_acks = packet.duplicate_ack_count,
            "Fast retransmit"
        );
        self.pending.push_front(packet.requeue());
        self.release(packet.length);
        Some(packet.seq_num)
    }

    /// Requeues every in-flight packet whose deadline is at or before `now`.
    /// Returns the expired sequence numbers in ascending order; the requeued
    /// packets keep that order at the head of the pending queue.
    ///
    /// 将所有截止时间不晚于 `now` 的在途包重新排队。按升序返回超时的序号；
    /// 这些包在待发队列队首保持同样的顺序。
    pub fn expire(&mut self, now: Instant) -> Vec<u32> {
        let expired: Vec<u32> = self
            .in_flight
            .values()
            .filter(|p| p.deadline <= now)
            .map(|p| p.seq_num)
            .collect();

        for seq in expired.iter().rev() {
            if let Some(packet) = self.in_flight.remove(seq) {
                debug!(seq = packet.seq_num, "Retransmission timeout");
                self.pending.push_front(packet.requeue());
                self.release(packet.length);
            }
        }
        expired
    }

    /// Whether another packet of the configured size would overflow the window.
    pub fn is_full(&self, window_bytes: u32) -> bool {
        u64::from(self.unacked_bytes) + u64::from(self.packet_size) > u64::from(window_bytes)
    }

    /// Dequeues as many pending packets as the window admits and charges
    /// them against it. The caller transmits them and then hands each back
    /// through [`SendWindow::mark_in_flight`].
    ///
    /// 从待发队列中取出窗口允许的尽可能多的包，并计入窗口占用。调用者发送这些包后
    /// 通过 [`SendWindow::mark_in_flight`] 交回。
    pub fn take_sendable(&mut self, window_bytes: u32) -> Vec<PendingPacket> {
        let mut batch = Vec::new();
        while !self.is_full(window_bytes) {
            if self.pending.is_empty() {
                self.schedule_batch();
            }
            let Some(packet) = self.pending.pop_front() else {
                break;
            };
            self.unacked_bytes += packet.length;
            batch.push(packet);
        }
        batch
    }

    /// Starts tracking a transmitted packet, due for retransmission at
    /// `sent_time + rto`.
    pub fn mark_in_flight(&mut self, packet: PendingPacket, sent_time: Instant, rto: Duration) {
        self.in_flight.insert(
            packet.seq_num,
            InFlightPacket {
                seq_num: packet.seq_num,
                length: packet.length,
                sent_time,
                deadline: sent_time + rto,
                retransmitted: packet.retransmitted,
                duplicate_ack_count: 0,
            },
        );
    }

    fn release(&mut self, length: u32) {
        // Floored at zero.
        self.unacked_bytes = self.unacked_bytes.saturating_sub(length);
    }

    /// Marks the connection as finished; no more acks will arrive.
    pub fn mark_closed(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn max_ack(&self) -> u32 {
        self.max_ack
    }

    pub fn unacked_bytes(&self) -> u32 {
        self.unacked_bytes
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// The oldest unacknowledged packet, the fast retransmit candidate.
    pub fn oldest_in_flight(&self) -> Option<&InFlightPacket> {
        self.in_flight.values().next()
    }

    pub fn in_flight(&self, seq_num: u32) -> Option<&InFlightPacket> {
        self.in_flight.get(&seq_num)
    }

    pub fn pending_front(&self) -> Option<&PendingPacket> {
        self.pending.front()
    }

    pub fn is_pending(&self, seq_num: u32) -> bool {
        self.pending.iter().any(|p| p.seq_num == seq_num)
    }
}
