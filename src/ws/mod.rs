//! WebSocket session gateway and wire protocol

pub mod handler;
pub mod protocol;
pub mod session;
