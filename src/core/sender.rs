//! The sender side of the probe.
//!
//! Three activities run concurrently during a trial: the window controller
//! (transmit path), the ack intake (receive path) and the timeout scanner.
//! They share two independently locked regions:
//!
//! - the queue region, a [`SendWindow`] behind a mutex plus a [`Notify`] the
//!   controller sleeps on while the window is full;
//! - the byte-counter region, the total of acknowledged bytes, written by the
//!   ack processor and sampled once per interval for bandwidth.
//!
//! Lock order is always queue region, then byte-counter region.
//!
//! 探测的发送端。
//!
//! 试验期间三个活动并发运行：窗口控制器（发送路径）、ACK接收（接收路径）和超时扫描器。
//! 它们共享两个独立加锁的区域：队列区域和字节计数区域。加锁顺序总是先队列后计数。

pub mod controller;
pub mod intake;
pub mod scanner;
pub mod stop_and_wait;
pub mod window;

use crate::{
    config::ProbeConfig,
    core::stats::{BandwidthSample, RttSample},
};
use tokio::sync::{Mutex, Notify};

pub use controller::WindowController;
pub use intake::spawn_ack_intake;
pub use stop_and_wait::StopAndWait;
pub use window::{AckEvent, InFlightPacket, PendingPacket, SendWindow};

/// State shared by the sender's concurrent activities for one session.
///
/// 同一会话中发送端并发活动共享的状态。
#[derive(Debug)]
pub struct SenderShared {
    /// The queue region.
    /// 队列区域。
    pub(crate) window: Mutex<SendWindow>,
    /// Signalled after every mutation that may unblock the controller: a new
    /// ack event, an expired deadline, or the end of the connection.
    ///
    /// 在每次可能解除控制器阻塞的修改之后发出信号。
    pub(crate) wake: Notify,
    /// The byte-counter region: bytes acknowledged since the session began.
    /// 字节计数区域：会话开始以来被确认的字节数。
    pub(crate) delivered_bytes: Mutex<u64>,
}

impl SenderShared {
    pub fn new(probe: &ProbeConfig) -> Self {
        Self {
            window: Mutex::new(SendWindow::new(
                probe.packet_size,
                probe.seed_packet_count(),
            )),
            wake: Notify::new(),
            delivered_bytes: Mutex::new(0),
        }
    }

    /// Total bytes acknowledged so far.
    pub async fn delivered_bytes(&self) -> u64 {
        *self.delivered_bytes.lock().await
    }

    /// The highest acknowledgment observed so far.
    pub async fn max_ack(&self) -> u32 {
        self.window.lock().await.max_ack()
    }

    pub(crate) async fn add_delivered(&self, bytes: u64) {
        if bytes > 0 {
            *self.delivered_bytes.lock().await += bytes;
        }
    }
}

/// Counts of retransmissions during one trial.
///
/// 一次试验中的重传计数。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetransmitCounts {
    pub fast: u32,
    pub timeout: u32,
}

/// Everything one trial measured.
///
/// 一次试验测得的全部结果。
#[derive(Debug, Clone, Default)]
pub struct TrialReport {
    /// Window used by the trial, in packets.
    pub window_packets: u32,
    /// Data frames written, including retransmissions.
    pub packets_sent: u64,
    pub retransmits: RetransmitCounts,
    pub rtt_samples: Vec<RttSample>,
    pub bandwidth_samples: Vec<BandwidthSample>,
}
