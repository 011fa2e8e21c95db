//! The probing protocol core: the sender-side window engine, the adaptive
//! window search, statistics, and the receiver-side reorder engine.
//! 探测协议核心：发送端窗口引擎、自适应窗口搜索、统计以及接收端重排引擎。

pub mod receiver;
pub mod search;
pub mod sender;
pub mod stats;

/// The first sequence number a fresh receiver expects.
///
/// 新接收端期望的第一个序列号。
pub const INITIAL_SEQUENCE: u32 = 1;
