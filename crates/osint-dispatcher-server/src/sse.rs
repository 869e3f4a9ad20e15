//! Server-Sent Events plumbing for the two streaming RPCs (`StreamResults`,
//! `StreamTasks`). Each streaming request gets its own generator (an
//! `async-stream` block), independent of every other subscriber, since
//! `StreamResults` and `StreamTasks` are per-task/per-worker feeds rather
//! than a single shared event log fanned out over a broadcast channel.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::{Body, Frame};
use serde::Serialize;
use tokio_stream::Stream;

/// One SSE frame: a `data:` event line per payload, a comment line (no
/// `event:`) for keepalives.
pub enum SseFrame {
    Data(String),
    KeepAlive,
}

impl SseFrame {
    pub fn data<T: Serialize>(value: &T) -> Self {
        SseFrame::Data(serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string()))
    }

    pub fn format(&self) -> String {
        match self {
            SseFrame::Data(json) => format!("event: message\ndata: {json}\n\n"),
            SseFrame::KeepAlive => ": keepalive\n\n".to_string(),
        }
    }
}

/// Wraps an arbitrary `Stream<Item = SseFrame>` as a hyper response body.
/// Infallible since nothing here can fail mid-stream — a dropped backing
/// task simply ends the stream.
pub struct SseStreamBody {
    stream: Pin<Box<dyn Stream<Item = SseFrame> + Send>>,
}

impl SseStreamBody {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = SseFrame> + Send + 'static,
    {
        Self { stream: Box::pin(stream) }
    }
}

impl Body for SseStreamBody {
    type Data = Bytes;
    type Error = std::convert::Infallible;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.stream.as_mut().poll_next(cx) {
            Poll::Ready(Some(frame)) => {
                Poll::Ready(Some(Ok(Frame::data(Bytes::from(frame.format())))))
            }
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn data_frame_uses_the_message_event_name() {
        let frame = SseFrame::data(&json!({"ok": true}));
        let formatted = frame.format();
        assert!(formatted.starts_with("event: message\ndata: "));
        assert!(formatted.ends_with("\n\n"));
    }

    #[test]
    fn keepalive_frame_has_no_event_line() {
        let formatted = SseFrame::KeepAlive.format();
        assert_eq!(formatted, ": keepalive\n\n");
    }
}
