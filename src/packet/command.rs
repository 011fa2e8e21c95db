//! 定义协议的所有命令/帧类型。
//! Defines all commands/frame types for the protocol.

use std::fmt;

/// The type of a frame. The first byte of every frame body.
/// 帧类型，每个帧体的第一个字节。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// Data frame carrying a sequence number and a payload.
    /// 携带序列号和载荷的数据帧。
    Data = 0x10,
    /// Cumulative or duplicate acknowledgment.
    /// 累积确认或重复确认。
    Ack = 0x11,
}

impl Command {
    /// 从一个字节尝试转换成 `Command`。
    /// Tries to convert a byte into a `Command`.
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x10 => Some(Command::Data),
            0x11 => Some(Command::Ack),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Command::Data => "DATA",
            Command::Ack => "ACK",
        };
        write!(f, "{}", s)
    }
}
