//! Request handlers.

pub mod agent_ws;
