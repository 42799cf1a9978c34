//! HTTP layer: health check and the agent WebSocket endpoint.

pub mod error;
pub mod handlers;
pub mod router;
