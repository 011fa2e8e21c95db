#![deny(clippy::expect_used, clippy::unwrap_used)]

//! The root of the window probe library: a sliding-window throughput and RTT
//! probe over a reliable byte stream, and the receiver it talks to.
//! 窗口探测库的根：基于可靠字节流的滑动窗口吞吐量与RTT探测器，以及与之通信的接收端。

pub mod config;
pub mod error;
pub mod packet;
pub mod transport;

pub mod core;
pub mod probe;
pub mod report;
pub mod server;

#[cfg(test)]
mod testing;
