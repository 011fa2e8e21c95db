//! The packet module, containing the frame definitions and their wire codec.
//! packet 模块，包含帧定义及其线上编解码。

pub mod command;
pub mod frame;
