//! 定义了协议中可以在字节流上传输的完整帧。
//! Defines the complete frames that can be transmitted over the byte stream.
//!
//! Every frame travels in a length-prefixed envelope:
//!
//! ```text
//! +----------------+---------+---------------------------+
//! | body_len (u32) | command | fields                    |
//! +----------------+---------+---------------------------+
//! DATA fields: seq_num (u32) + payload (body_len - 5 bytes)
//! ACK  fields: ack_num (u32)
//! ```
//!
//! The prefix lets a reader skip a body it cannot decode without losing its
//! place in the stream.

use super::command::Command;
use bytes::{Buf, BufMut, Bytes};

/// Size of the big-endian body length that precedes every frame body.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Upper bound on a frame body. A larger length prefix means the stream is
/// corrupt.
///
/// 帧体长度上限。更大的长度前缀意味着字节流已损坏。
pub const MAX_BODY_SIZE: usize = 1 << 20;

const COMMAND_SIZE: usize = 1;
const NUMBER_SIZE: usize = 4;

/// A complete protocol frame that can be sent or received.
/// 一个可以被发送或接收的完整协议帧。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A data frame. The payload is placeholder bytes of the probe's packet size.
    /// 数据帧。载荷是探测包大小的占位字节。
    Data { seq_num: u32, payload: Bytes },
    /// An acknowledgment carrying the receiver's next expected sequence number.
    /// 携带接收方下一个期望序列号的确认帧。
    Ack { ack_num: u32 },
}

impl Frame {
    /// Creates a new DATA frame.
    /// 创建一个新的 DATA 帧。
    pub fn new_data(seq_num: u32, payload: Bytes) -> Self {
        Frame::Data { seq_num, payload }
    }

    /// Creates a new ACK frame.
    /// 创建一个新的 ACK 帧。
    pub fn new_ack(ack_num: u32) -> Self {
        Frame::Ack { ack_num }
    }

    /// Returns the command byte of this frame.
    pub fn command(&self) -> Command {
        match self {
            Frame::Data { .. } => Command::Data,
            Frame::Ack { .. } => Command::Ack,
        }
    }

    /// Returns the sequence number of a DATA frame.
    pub fn sequence_number(&self) -> Option<u32> {
        match self {
            Frame::Data { seq_num, .. } => Some(*seq_num),
            Frame::Ack { .. } => None,
        }
    }

    /// Returns the acknowledgment number of an ACK frame.
    pub fn ack_number(&self) -> Option<u32> {
        match self {
            Frame::Ack { ack_num } => Some(*ack_num),
            Frame::Data { .. } => None,
        }
    }

    /// Length of the body, excluding the length prefix.
    ///
    /// 帧体长度，不含长度前缀。
    pub fn body_len(&self) -> usize {
        match self {
            Frame::Data { payload, .. } => COMMAND_SIZE + NUMBER_SIZE + payload.len(),
            Frame::Ack { .. } => COMMAND_SIZE + NUMBER_SIZE,
        }
    }

    /// Number of bytes this frame occupies on the stream.
    ///
    /// 此帧在字节流上占用的字节数。
    pub fn wire_len(&self) -> usize {
        LENGTH_PREFIX_SIZE + self.body_len()
    }

    /// 将帧（含长度前缀）编码到缓冲区。
    /// Encodes the frame, including its length prefix, into a buffer.
    pub fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32(self.body_len() as u32);
        buf.put_u8(self.command() as u8);
        match self {
            Frame::Data { seq_num, payload } => {
                buf.put_u32(*seq_num);
                buf.put_slice(payload);
            }
            Frame::Ack { ack_num } => {
                buf.put_u32(*ack_num);
            }
        }
    }

    /// Decodes a frame body whose length prefix has already been consumed.
    /// Returns `None` if the body is not a well-formed frame.
    ///
    /// 解码一个已去掉长度前缀的帧体。如果帧体格式不正确则返回 `None`。
    pub fn decode_body<B: Buf>(body: &mut B) -> Option<Self> {
        if body.remaining() < COMMAND_SIZE + NUMBER_SIZE {
            return None;
        }
        let command = Command::from_u8(body.get_u8())?;
        let number = body.get_u32();
        match command {
            Command::Data => {
                let payload = body.copy_to_bytes(body.remaining());
                Some(Frame::Data {
                    seq_num: number,
                    payload,
                })
            }
            Command::Ack => {
                if body.has_remaining() {
                    // Trailing bytes after an ACK mean the sender speaks another dialect.
                    return None;
                }
                Some(Frame::Ack { ack_num: number })
            }
        }
    }

    /// Decodes a single enveloped frame from the front of a buffer cursor.
    /// The cursor is advanced past the frame only if it is complete and valid.
    ///
    /// 从缓冲区光标的前端解码单个带长度前缀的帧。
    /// 只有当帧完整且有效时光标才会前进。
    #[cfg(test)]
    pub(crate) fn decode(cursor: &mut &[u8]) -> Option<Self> {
        if cursor.len() < LENGTH_PREFIX_SIZE {
            return None;
        }
        let body_len = u32::from_be_bytes(cursor[..LENGTH_PREFIX_SIZE].try_into().ok()?) as usize;
        if body_len > MAX_BODY_SIZE || cursor.len() < LENGTH_PREFIX_SIZE + body_len {
            return None;
        }
        let mut body = &cursor[LENGTH_PREFIX_SIZE..LENGTH_PREFIX_SIZE + body_len];
        let frame = Frame::decode_body(&mut body)?;
        cursor.advance(LENGTH_PREFIX_SIZE + body_len);
        Some(frame)
    }
}
