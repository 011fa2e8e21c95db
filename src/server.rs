//! The receiving server: accepts probe connections and acknowledges their
//! data frames through a [`ReorderEngine`] per connection.
//!
//! 接收服务器：接受探测连接，并为每个连接通过一个 [`ReorderEngine`] 确认数据帧。

use crate::{
    config::ReceiverConfig,
    core::receiver::{ReceiverStats, ReorderEngine},
    error::Result,
    packet::frame::Frame,
    transport::{FrameSink, FrameSource, tcp},
};
use async_trait::async_trait;
use std::{io, net::SocketAddr};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

/// Source of incoming connections for [`Server`].
///
/// [`Server`] 的入站连接来源。
#[async_trait]
trait Accept: Send {
    async fn accept(&mut self) -> io::Result<(TcpStream, SocketAddr)>;
}

#[async_trait]
impl Accept for TcpListener {
    async fn accept(&mut self) -> io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self).await
    }
}

/// A TCP listener that runs one receiving session per accepted connection.
///
/// 为每个接受的连接运行一个接收会话的TCP监听器。
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    config: ReceiverConfig,
}

impl Server {
    pub async fn bind(addr: SocketAddr, config: ReceiverConfig) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "Receiver listening");
        Ok(Self { listener, config })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections forever. Each one gets its own task and its own
    /// session state; a failed session is logged and does not stop the loop.
    ///
    /// 持续接受连接。每个连接拥有独立的任务和会话状态；失败的会话会被记录，但不会停止循环。
    pub async fn serve(self) -> Result<()> {
        accept_loop(self.listener, self.config.receive_window_budget).await
    }
}

/// Accepts until the process ends. A failed accept is logged and skipped.
async fn accept_loop<A: Accept>(mut acceptor: A, budget: u32) -> Result<()> {
    loop {
        match acceptor.accept().await {
            Ok((stream, peer)) => spawn_session(stream, peer, budget),
            Err(e) => warn!(error = %e, "Accept failed"),
        }
    }
}

fn spawn_session(stream: TcpStream, peer: SocketAddr, budget: u32) {
    if let Err(e) = stream.set_nodelay(true) {
        warn!(%peer, error = %e, "Failed to set TCP_NODELAY");
    }
    info!(%peer, "Accepted connection");

    tokio::spawn(async move {
        let (sink, source) = tcp::split(stream);
        match serve_connection(source, sink, budget).await {
            Ok(stats) => info!(%peer, ?stats, "Connection finished"),
            Err(e) => warn!(%peer, error = %e, "Connection failed"),
        }
    });
}

/// Runs one receiving session until the peer closes the stream.
///
/// Data frames go through the reorder engine and the resulting ack, if any,
/// is written back. Malformed frames and stray acks are logged and skipped.
/// Buffered frames are released however the session ends.
///
/// 运行一个接收会话，直到对端关闭字节流。数据帧经过重排序引擎处理，产生的确认（如有）被写回。
/// 格式错误的帧和多余的ACK会被记录并跳过。无论会话如何结束，缓存的帧都会被释放。
pub async fn serve_connection<S, K>(
    mut source: S,
    mut sink: K,
    budget: u32,
) -> Result<ReceiverStats>
where
    S: FrameSource,
    K: FrameSink,
{
    let mut engine = ReorderEngine::new(budget);
    let result = run_session(&mut engine, &mut source, &mut sink).await;

    let released = engine.release();
    if released > 0 {
        debug!(released, "Released buffered frames");
    }
    result.map(|_| engine.stats())
}

async fn run_session<S, K>(engine: &mut ReorderEngine, source: &mut S, sink: &mut K) -> Result<()>
where
    S: FrameSource,
    K: FrameSink,
{
    loop {
        let frame = match source.recv_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(()),
            Err(e) if !e.is_fatal() => {
                warn!(error = %e, "Skipping malformed frame");
                engine.on_malformed();
                continue;
            }
            Err(e) => return Err(e),
        };

        match &frame {
            Frame::Data { seq_num, .. } => {
                let delivery = engine.on_data(*seq_num, frame.wire_len() as u32);
                if let Some(ack) = delivery.ack() {
                    sink.send_frame(&ack).await?;
                }
            }
            Frame::Ack { ack_num } => {
                debug!(ack = ack_num, "Ignoring ack frame sent to the receiver");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::framed;
    use bytes::Bytes;
    use tokio::io::duplex;

    fn data(seq: u32) -> Frame {
        Frame::new_data(seq, Bytes::from(vec![0u8; 32]))
    }

    #[tokio::test]
    async fn test_session_acks_reordered_stream() {
        let (client, server) = duplex(64 * 1024);
        let (mut sink, mut acks) = framed(client);
        let (server_sink, server_source) = framed(server);
        let session = tokio::spawn(serve_connection(server_source, server_sink, 65_536));

        for seq in [1, 3, 2, 2] {
            sink.send_frame(&data(seq)).await.unwrap();
        }
        sink.send_frame(&Frame::new_ack(1)).await.unwrap();
        sink.close().await.unwrap();

        let mut received = Vec::new();
        while let Some(frame) = acks.recv_frame().await.unwrap() {
            received.push(frame.ack_number().unwrap());
        }
        assert_eq!(received, vec![2, 2, 4]);

        let stats = session.await.unwrap().unwrap();
        assert_eq!(stats.frames_received, 4);
        assert_eq!(stats.acks_sent, 3);
        assert_eq!(stats.stale_frames, 1);
    }

    #[tokio::test]
    async fn test_server_accepts_tcp_connections() {
        let server = Server::bind("127.0.0.1:0".parse().unwrap(), ReceiverConfig::default())
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.serve());

        let stream = tcp::connect(addr, None).await.unwrap();
        let (mut sink, mut source) = tcp::split(stream);
        sink.send_frame(&data(1)).await.unwrap();
        assert_eq!(source.recv_frame().await.unwrap(), Some(Frame::new_ack(2)));
    }

    /// Fails a fixed number of accepts before handing out real connections.
    struct FlakyListener {
        inner: TcpListener,
        failures: usize,
    }

    #[async_trait]
    impl Accept for FlakyListener {
        async fn accept(&mut self) -> io::Result<(TcpStream, SocketAddr)> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(io::Error::other("too many open files"));
            }
            self.inner.accept().await
        }
    }

    #[tokio::test]
    async fn test_failed_accept_does_not_stop_the_loop() {
        let inner = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = inner.local_addr().unwrap();
        let acceptor = FlakyListener { inner, failures: 2 };
        let server = tokio::spawn(accept_loop(acceptor, 65_536));

        for _ in 0..2 {
            let stream = tcp::connect(addr, None).await.unwrap();
            let (mut sink, mut source) = tcp::split(stream);
            sink.send_frame(&data(1)).await.unwrap();
            assert_eq!(source.recv_frame().await.unwrap(), Some(Frame::new_ack(2)));
        }
        assert!(!server.is_finished());
        server.abort();
    }
}
