//! # Parley Transport
//!
//! Network transports used by Parley chat engines.
//!
//! ## Features
//!
//! - `ws-client`: a WebSocket client connection ([`websocket::WsConnection`])
//! - `http-server`: a form-POST webhook receiver ([`http::WebhookServer`])
//! - `full`: both
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  Engine Layer       │  (console, slack)
//! ├─────────────────────┤
//! │  parley-core        │  (Event, TransportError)
//! ├─────────────────────┤
//! │  parley-transport   │  <- This crate
//! ├─────────────────────┤
//! │  Network (TCP/HTTP) │
//! └─────────────────────┘
//! ```
//!
//! Transports do no reconnecting: a dropped connection surfaces as
//! [`TransportError::ConnectionClosed`](parley_core::TransportError) and is
//! fatal to the engine using it.

#[cfg(feature = "http-server")]
pub mod http;

#[cfg(feature = "ws-client")]
pub mod websocket;

#[cfg(feature = "http-server")]
pub use http::{FormConverter, WebhookServer};

#[cfg(feature = "ws-client")]
pub use websocket::WsConnection;
