//! Outbound event sink.

use std::future::Future;

use thiserror::Error;

use solquill_types::event::ServerEvent;

/// The client went away; nothing more can be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("event sink closed")]
pub struct SinkClosed;

/// Destination of the events produced while handling a frame.
///
/// The WebSocket handler implements this over the socket's write half.
pub trait EventSink: Send {
    fn send(&mut self, event: ServerEvent) -> impl Future<Output = Result<(), SinkClosed>> + Send;
}

/// Collects events in memory.
impl EventSink for Vec<ServerEvent> {
    async fn send(&mut self, event: ServerEvent) -> Result<(), SinkClosed> {
        self.push(event);
        Ok(())
    }
}
