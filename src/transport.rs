//! Transport layer abstraction for the frame channel.
//!
//! This module provides an abstraction over the underlying byte stream,
//! handling frame serialization/deserialization. The probe engine only needs
//! to send a frame and to receive the next one.
//!
//! 帧通道的传输层抽象。
//!
//! 此模块提供底层字节流的抽象，处理帧的序列化/反序列化。
//! 探测引擎只需要发送一个帧和接收下一个帧。

pub mod stream;
pub mod tcp;

use crate::{error::Result, packet::frame::Frame};
use async_trait::async_trait;

pub use stream::{StreamSink, StreamSource, framed};

/// The sending half of a frame channel.
///
/// 帧通道的发送端。
#[async_trait]
pub trait FrameSink: Send + 'static {
    /// Sends one frame. Any error is fatal for the session.
    ///
    /// 发送一个帧。任何错误对会话都是致命的。
    async fn send_frame(&mut self, frame: &Frame) -> Result<()>;

    /// Closes the sending direction so the peer observes end of stream.
    ///
    /// 关闭发送方向，使对端观察到字节流结束。
    async fn close(&mut self) -> Result<()>;
}

/// The receiving half of a frame channel.
///
/// 帧通道的接收端。
#[async_trait]
pub trait FrameSource: Send + 'static {
    /// Receives the next frame.
    ///
    /// Returns `Ok(None)` once the peer has closed the stream. An
    /// `Error::InvalidFrame` is recoverable: the offending body has already
    /// been skipped and the next call continues with the following frame.
    ///
    /// 接收下一个帧。
    ///
    /// 对端关闭字节流后返回 `Ok(None)`。`Error::InvalidFrame` 是可恢复的：
    /// 出错的帧体已被跳过，下一次调用会继续读取后续帧。
    async fn recv_frame(&mut self) -> Result<Option<Frame>>;
}
