//! Integration layer: contracts for the pluggable collaborators.
//!
//! - [`Engine`]: a chat backend that produces events and delivers replies
//! - [`Memory`]: key/value persistence for handlers

pub mod engine;
pub mod memory;

pub use engine::{BoxedEngine, ChatParts, ConfigurableEngine, Engine, EventSource};
pub use memory::{BoxedMemory, ConfigurableMemory, Memory, MemoryExt};
