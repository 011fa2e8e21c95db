//! TCP plumbing for the frame channel.
//!
//! 帧通道的TCP管道。

use super::stream::{StreamSink, StreamSource};
use crate::error::Result;
use std::net::SocketAddr;
use tokio::net::{
    TcpSocket, TcpStream,
    tcp::{OwnedReadHalf, OwnedWriteHalf},
};
use tracing::info;

/// Frame sink over the write half of a TCP connection.
pub type TcpFrameSink = StreamSink<OwnedWriteHalf>;
/// Frame source over the read half of a TCP connection.
pub type TcpFrameSource = StreamSource<OwnedReadHalf>;

/// Connects to `remote_addr`, optionally binding the local end to `src_port`
/// first.
///
/// 连接到 `remote_addr`，可选地先将本地端绑定到 `src_port`。
pub async fn connect(remote_addr: SocketAddr, src_port: Option<u16>) -> Result<TcpStream> {
    let socket = if remote_addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    if let Some(port) = src_port {
        let local: SocketAddr = if remote_addr.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], port))
        } else {
            SocketAddr::from(([0u16; 8], port))
        };
        socket.set_reuseaddr(true)?;
        socket.bind(local)?;
    }
    let stream = socket.connect(remote_addr).await?;
    // Frames are small and latency is what we measure.
    stream.set_nodelay(true)?;
    info!(
        local = %stream.local_addr()?,
        remote = %remote_addr,
        "Connected to the receiver"
    );
    Ok(stream)
}

/// Splits a TCP connection into a frame sink and a frame source.
///
/// 将TCP连接拆分为帧发送端和帧接收端。
pub fn split(stream: TcpStream) -> (TcpFrameSink, TcpFrameSource) {
    let (reader, writer) = stream.into_split();
    (StreamSink::new(writer), StreamSource::new(reader))
}
