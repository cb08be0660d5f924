//! WebSocket transport implementations.

mod client;

pub use client::WsConnection;
