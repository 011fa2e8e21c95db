//! Frame channel halves over any tokio byte stream.
//!
//! 基于任意 tokio 字节流的帧通道两端。

use super::{FrameSink, FrameSource};
use crate::{
    error::{Error, Result},
    packet::frame::{Frame, MAX_BODY_SIZE},
};
use async_trait::async_trait;
use bytes::BytesMut;
use std::io::ErrorKind;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tracing::trace;

/// Writes enveloped frames to a byte stream.
///
/// 将带长度前缀的帧写入字节流。
#[derive(Debug)]
pub struct StreamSink<W> {
    writer: W,
    buf: BytesMut,
}

impl<W> StreamSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            buf: BytesMut::new(),
        }
    }
}

#[async_trait]
impl<W> FrameSink for StreamSink<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn send_frame(&mut self, frame: &Frame) -> Result<()> {
        self.buf.clear();
        frame.encode(&mut self.buf);
        self.writer.write_all(&self.buf).await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

/// Reads enveloped frames from a byte stream.
///
/// 从字节流读取带长度前缀的帧。
#[derive(Debug)]
pub struct StreamSource<R> {
    reader: R,
}

impl<R> StreamSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl<R> FrameSource for StreamSource<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    async fn recv_frame(&mut self) -> Result<Option<Frame>> {
        let body_len = match self.reader.read_u32().await {
            Ok(len) => len as usize,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if body_len > MAX_BODY_SIZE {
            return Err(Error::FrameTooLarge(body_len));
        }

        let mut body = BytesMut::zeroed(body_len);
        match self.reader.read_exact(&mut body).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                return Err(Error::ConnectionClosed);
            }
            Err(e) => return Err(e.into()),
        }

        let mut body = body.freeze();
        match Frame::decode_body(&mut body) {
            Some(frame) => Ok(Some(frame)),
            None => {
                trace!(body_len, "Skipping undecodable frame body");
                Err(Error::InvalidFrame)
            }
        }
    }
}

/// Splits a duplex byte stream into a frame sink and a frame source.
///
/// 将双工字节流拆分为帧发送端和帧接收端。
pub fn framed<S>(stream: S) -> (StreamSink<WriteHalf<S>>, StreamSource<ReadHalf<S>>)
where
    S: AsyncRead + AsyncWrite,
{
    let (reader, writer) = tokio::io::split(stream);
    (StreamSink::new(writer), StreamSource::new(reader))
}
