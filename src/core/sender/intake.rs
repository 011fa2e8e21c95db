//! The ack intake: the sender's receive path.
//!
//! 确认接收：发送端的接收路径。

use super::SenderShared;
use crate::{error::Result, packet::frame::Frame, transport::FrameSource};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Spawns the task that turns incoming ACK frames into ack events.
///
/// Every ack is queued in the shared window and the controller is notified.
/// Malformed frames are skipped. When the stream ends, cleanly or with a
/// fatal error, the window is marked closed so no waiter hangs; the task
/// returns the fatal error, if any.
///
/// 启动将收到的ACK帧转换为确认事件的任务。每个ACK都被加入共享窗口并通知控制器。
/// 格式错误的帧被跳过。字节流结束时（正常或致命错误），窗口被标记为关闭，使等待者不会挂起；
/// 任务返回致命错误（如有）。
pub fn spawn_ack_intake<S>(mut source: S, shared: Arc<SenderShared>) -> JoinHandle<Result<()>>
where
    S: FrameSource,
{
    tokio::spawn(async move {
        let result = loop {
            match source.recv_frame().await {
                Ok(Some(Frame::Ack { ack_num })) => {
                    trace!(ack = ack_num, "Ack received");
                    shared.window.lock().await.push_ack(ack_num);
                    shared.wake.notify_one();
                }
                Ok(Some(frame)) => {
                    warn!(command = %frame.command(), "Ignoring unexpected frame on the ack path");
                }
                Ok(None) => {
                    debug!("Receiver closed the connection");
                    break Ok(());
                }
                Err(e) if !e.is_fatal() => {
                    warn!(error = %e, "Dropping malformed frame");
                }
                Err(e) => break Err(e),
            }
        };

        shared.window.lock().await.mark_closed();
        shared.wake.notify_one();
        result
    })
}
