//! # Parley Memory
//!
//! Memory backends for the Parley chat-bot runtime.
//!
//! | Backend | Name | Feature | Persistence |
//! |---------|------|---------|-------------|
//! | [`MemoryDict`] | `dict` | always | process lifetime |
//! | `RedisMemory` | `redis` | `redis` | redis server |
//!
//! Backends are selected by name through
//! [`ConfigurableMemory`](parley_core::ConfigurableMemory).

pub mod dict;

#[cfg(feature = "redis")]
pub mod redis;

pub use dict::MemoryDict;

#[cfg(feature = "redis")]
pub use redis::{RedisMemory, RedisMemoryConfig};
