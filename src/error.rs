//! 定义了库中所有可能的错误类型。
//! Defines all possible error types in the library.

use thiserror::Error;

/// The primary error type for the window probe library.
/// 窗口探测库的主要错误类型。
#[derive(Debug, Error)]
pub enum Error {
    /// An underlying I/O error occurred.
    /// 发生了底层的I/O错误。
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A received frame was malformed and could not be decoded.
    /// 接收到的帧格式错误，无法解码。
    #[error("Malformed frame received")]
    InvalidFrame,

    /// A frame announced a body larger than the codec accepts. The stream can
    /// no longer be trusted after this.
    ///
    /// 帧声明的长度超过了编解码器的上限。此后字节流不再可信。
    #[error("Frame of {0} bytes exceeds the maximum frame size")]
    FrameTooLarge(usize),

    /// The connection was closed by the peer.
    /// 连接被对端关闭。
    #[error("Connection closed by peer")]
    ConnectionClosed,

    /// The configuration cannot drive a probe.
    /// 配置无法驱动探测。
    #[error("Invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// A stop-and-wait packet was retransmitted the maximum number of times
    /// without being acknowledged.
    ///
    /// 停等模式下的数据包达到最大重传次数仍未被确认。
    #[error("Packet {seq_num} was not acknowledged after {attempts} attempts")]
    RetriesExhausted { seq_num: u32, attempts: u8 },

    /// A background task panicked or was cancelled.
    /// 后台任务崩溃或被取消。
    #[error("Background task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

impl Error {
    /// Returns `true` if the error ends the session. Malformed frames are the
    /// only recoverable kind: they are dropped and the stream continues.
    ///
    /// 如果错误会终止会话则返回 `true`。只有格式错误的帧是可恢复的。
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::InvalidFrame)
    }
}

/// A specialized `Result` type for this library.
/// 本库专用的 `Result` 类型。
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        use std::io::ErrorKind;
        match err {
            Error::Io(e) => e,
            Error::InvalidFrame => ErrorKind::InvalidData.into(),
            Error::FrameTooLarge(_) => ErrorKind::InvalidData.into(),
            Error::ConnectionClosed => ErrorKind::ConnectionReset.into(),
            Error::InvalidConfig(msg) => std::io::Error::new(ErrorKind::InvalidInput, msg),
            Error::RetriesExhausted { .. } => ErrorKind::TimedOut.into(),
            Error::TaskFailed(e) => std::io::Error::other(e),
        }
    }
}
