//! Per-connection dispatch and the process-wide connection registry.

pub mod dispatch;
pub mod registry;
pub mod sink;

pub use dispatch::{ConnectionSession, FrameFailure};
pub use registry::{ConnectionRegistry, ConnectionTicket};
pub use sink::{EventSink, SinkClosed};
