//! HTTP transport implementations.

mod server;

pub use server::{FormConverter, WebhookServer};
