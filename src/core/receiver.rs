//! The receiver's reorder engine.
//!
//! Tracks the next expected sequence number of one connection and buffers
//! frames that arrive ahead of it, bounded by a byte budget. The engine is
//! pure bookkeeping: it decides which acknowledgment to send and the caller
//! sends it.
//!
//! 接收端的重排序引擎。
//!
//! 跟踪单个连接的下一个期望序号，并在字节预算内缓存提前到达的帧。引擎只负责记账：
//! 它决定发送哪个确认，由调用者负责发送。

use crate::{core::INITIAL_SEQUENCE, packet::frame::Frame};
use std::collections::BTreeMap;
use tracing::{debug, trace, warn};

/// What the engine did with one data frame.
///
/// 引擎对一个数据帧的处理结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The frame was the expected one. `expected_seq` moved from `from` to
    /// `to`, flushing `flushed` buffered frames on the way.
    /// 该帧正是期望的帧。`expected_seq` 从 `from` 前进到 `to`，途中冲刷了 `flushed` 个缓存帧。
    Advanced { from: u32, to: u32, flushed: u32 },
    /// The frame is ahead of the expected one and was buffered; `ack_num`
    /// repeats the current expected sequence to signal the gap.
    /// 该帧超前于期望帧并已缓存；`ack_num` 重复当前期望序号以提示缺口。
    Buffered { seq_num: u32, ack_num: u32 },
    /// Ahead, but already buffered.
    AlreadyBuffered { seq_num: u32 },
    /// Ahead, but the budget cannot hold it.
    BufferFull { seq_num: u32 },
    /// Behind the expected sequence: a duplicate.
    Stale { seq_num: u32 },
}

impl Delivery {
    /// The acknowledgment to send for this delivery, if any.
    ///
    /// 此次交付需要发送的确认（如有）。
    pub fn ack(&self) -> Option<Frame> {
        match *self {
            Delivery::Advanced { to, .. } => Some(Frame::new_ack(to)),
            Delivery::Buffered { ack_num, .. } => Some(Frame::new_ack(ack_num)),
            Delivery::AlreadyBuffered { .. }
            | Delivery::BufferFull { .. }
            | Delivery::Stale { .. } => None,
        }
    }
}

/// Per-connection counters, logged when the connection ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    pub frames_received: u64,
    pub frames_buffered: u64,
    pub frames_flushed: u64,
    pub frames_dropped: u64,
    pub stale_frames: u64,
    pub acks_sent: u64,
    pub malformed_frames: u64,
}

/// The session state of one receiving connection.
///
/// 单个接收连接的会话状态。
#[derive(Debug)]
pub struct ReorderEngine {
    expected_seq: u32,
    remaining_budget: u32,
    /// Buffered out-of-order frames: sequence number -> bytes charged.
    buffered: BTreeMap<u32, u32>,
    stats: ReceiverStats,
}

impl ReorderEngine {
    pub fn new(budget: u32) -> Self {
        Self {
            expected_seq: INITIAL_SEQUENCE,
            remaining_budget: budget,
            buffered: BTreeMap::new(),
            stats: ReceiverStats::default(),
        }
    }

    /// Handles a data frame of `frame_size` bytes carrying `seq_num`.
    pub fn on_data(&mut self, seq_num: u32, frame_size: u32) -> Delivery {
        self.stats.frames_received += 1;

        let delivery = if seq_num == self.expected_seq {
            self.advance()
        } else if seq_num > self.expected_seq {
            self.buffer(seq_num, frame_size)
        } else {
            trace!(seq = seq_num, expected = self.expected_seq, "Stale frame ignored");
            self.stats.stale_frames += 1;
            Delivery::Stale { seq_num }
        };

        if delivery.ack().is_some() {
            self.stats.acks_sent += 1;
        }
        delivery
    }

    fn advance(&mut self) -> Delivery {
        let from = self.expected_seq;
        self.expected_seq = self.expected_seq.wrapping_add(1);

        let mut flushed = 0;
        while let Some(size) = self.buffered.remove(&self.expected_seq) {
            self.remaining_budget += size;
            self.expected_seq = self.expected_seq.wrapping_add(1);
            flushed += 1;
        }
        self.stats.frames_flushed += u64::from(flushed);

        trace!(from, to = self.expected_seq, flushed, "Expected sequence advanced");
        Delivery::Advanced {
            from,
            to: self.expected_seq,
            flushed,
        }
    }

    fn buffer(&mut self, seq_num: u32, frame_size: u32) -> Delivery {
        if self.buffered.contains_key(&seq_num) {
            self.stats.frames_dropped += 1;
            return Delivery::AlreadyBuffered { seq_num };
        }
        if self.remaining_budget < frame_size {
            warn!(
                seq = seq_num,
                remaining_budget = self.remaining_budget,
                "Receive buffer full, dropping frame"
            );
            self.stats.frames_dropped += 1;
            return Delivery::BufferFull { seq_num };
        }

        self.remaining_budget -= frame_size;
        self.buffered.insert(seq_num, frame_size);
        self.stats.frames_buffered += 1;
        debug!(seq = seq_num, expected = self.expected_seq, "Out-of-order frame buffered");
        Delivery::Buffered {
            seq_num,
            ack_num: self.expected_seq,
        }
    }

    /// Counts a frame that could not be decoded.
    pub fn on_malformed(&mut self) {
        self.stats.malformed_frames += 1;
    }

    /// Releases every buffered frame when the connection ends.
    pub fn release(&mut self) -> usize {
        let released = self.buffered.len();
        self.remaining_budget += self.buffered.values().sum::<u32>();
        self.buffered.clear();
        released
    }

    pub fn expected_seq(&self) -> u32 {
        self.expected_seq
    }

    pub fn remaining_budget(&self) -> u32 {
        self.remaining_budget
    }

    pub fn buffered_len(&self) -> usize {
        self.buffered.len()
    }

    pub fn is_buffered(&self, seq_num: u32) -> bool {
        self.buffered.contains_key(&seq_num)
    }

    pub fn stats(&self) -> ReceiverStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: u32 = 100;

    #[test]
    fn test_in_order_frames_advance_with_cumulative_acks() {
        let mut engine = ReorderEngine::new(1_000);
        let d = engine.on_data(1, FRAME);
        assert_eq!(
            d,
            Delivery::Advanced {
                from: 1,
                to: 2,
                flushed: 0
            }
        );
        assert_eq!(d.ack(), Some(Frame::new_ack(2)));
        assert_eq!(engine.on_data(2, FRAME).ack(), Some(Frame::new_ack(3)));
        assert_eq!(engine.expected_seq(), 3);
    }

    #[test]
    fn test_reordered_frames_flush_once() {
        let mut engine = ReorderEngine::new(1_000);

        assert_eq!(engine.on_data(1, FRAME).ack(), Some(Frame::new_ack(2)));

        let d = engine.on_data(3, FRAME);
        assert_eq!(d, Delivery::Buffered { seq_num: 3, ack_num: 2 });
        assert_eq!(d.ack(), Some(Frame::new_ack(2)));
        assert_eq!(engine.remaining_budget(), 900);

        let d = engine.on_data(2, FRAME);
        assert_eq!(
            d,
            Delivery::Advanced {
                from: 2,
                to: 4,
                flushed: 1
            }
        );
        assert_eq!(engine.expected_seq(), 4);
        assert_eq!(engine.buffered_len(), 0);
        assert_eq!(engine.remaining_budget(), 1_000);
        assert_eq!(engine.stats().frames_flushed, 1);
    }

    #[test]
    fn test_redelivered_frame_changes_nothing() {
        let mut engine = ReorderEngine::new(1_000);
        engine.on_data(1, FRAME);
        engine.on_data(2, FRAME);

        let d = engine.on_data(1, FRAME);
        assert_eq!(d, Delivery::Stale { seq_num: 1 });
        assert!(d.ack().is_none());
        assert_eq!(engine.expected_seq(), 3);
        assert_eq!(engine.buffered_len(), 0);
        assert_eq!(engine.remaining_budget(), 1_000);
    }

    #[test]
    fn test_already_buffered_frame_is_dropped_silently() {
        let mut engine = ReorderEngine::new(1_000);
        engine.on_data(5, FRAME);
        let d = engine.on_data(5, FRAME);
        assert_eq!(d, Delivery::AlreadyBuffered { seq_num: 5 });
        assert!(d.ack().is_none());
        assert_eq!(engine.remaining_budget(), 900);
    }

    #[test]
    fn test_budget_bounds_buffering() {
        let mut engine = ReorderEngine::new(250);
        assert!(matches!(engine.on_data(3, FRAME), Delivery::Buffered { .. }));
        assert!(matches!(engine.on_data(4, FRAME), Delivery::Buffered { .. }));

        let d = engine.on_data(5, FRAME);
        assert_eq!(d, Delivery::BufferFull { seq_num: 5 });
        assert!(d.ack().is_none());
        assert!(!engine.is_buffered(5));

        // Filling the gap restores the budget.
        engine.on_data(1, FRAME);
        engine.on_data(2, FRAME);
        assert_eq!(engine.expected_seq(), 5);
        assert_eq!(engine.remaining_budget(), 250);
    }

    #[test]
    fn test_release_returns_budget() {
        let mut engine = ReorderEngine::new(1_000);
        engine.on_data(7, FRAME);
        engine.on_data(9, 150);
        assert_eq!(engine.release(), 2);
        assert_eq!(engine.buffered_len(), 0);
        assert_eq!(engine.remaining_budget(), 1_000);
    }

    #[test]
    fn test_stats_count_acks() {
        let mut engine = ReorderEngine::new(1_000);
        engine.on_data(1, FRAME);
        engine.on_data(3, FRAME);
        engine.on_data(3, FRAME);
        engine.on_data(1, FRAME);
        let stats = engine.stats();
        assert_eq!(stats.frames_received, 4);
        assert_eq!(stats.acks_sent, 2);
        assert_eq!(stats.frames_dropped, 1);
        assert_eq!(stats.stale_frames, 1);
    }
}
