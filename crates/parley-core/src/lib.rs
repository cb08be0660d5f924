//! # Parley Core
//!
//! The core event model of the Parley chat-bot runtime.
//!
//! This crate holds everything the dispatch machinery and the pluggable
//! collaborators have to agree on, and nothing else:
//!
//! ## Architecture Layers
//!
//! ### Foundation Layer
//!
//! - **Events**: immutable field mappings produced by an event source ([`Event`])
//! - **Predicates**: structural subset matching against events ([`Predicate`])
//! - **Errors**: transport, memory and engine error taxonomies
//!
//! ### Integration Layer
//!
//! - **Engines**: chat backends that produce events and deliver replies ([`Engine`], [`EventSource`])
//! - **Memory**: key/value persistence used by handlers ([`Memory`])
//!
//! ## Data Flow
//!
//! ```text
//! ┌─────────────┐     ┌────────────┐     ┌───────────┐
//! │   Engine    │────▶│ Dispatcher │────▶│  Handler  │──▶ Memory / send
//! │ (console..) │     │ (framework)│────▶│  Handler  │
//! └─────────────┘     └────────────┘     └───────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use parley_core::{Event, Predicate};
//! use serde_json::json;
//!
//! let event = Event::from_value(json!({"type": "message", "text": "hi"})).unwrap();
//! let predicate = Predicate::new().field("type", "message");
//!
//! assert!(predicate.matches(&event));
//! ```

pub mod foundation;
pub mod integration;

pub use foundation::{
    EngineError, EngineResult, Event, MemoryError, MemoryResult, Predicate, TransportError,
    TransportResult,
};

pub use integration::{
    BoxedEngine, BoxedMemory, ChatParts, ConfigurableEngine, ConfigurableMemory, Engine,
    EventSource, Memory, MemoryExt,
};

/// Prelude for common imports.
pub mod prelude {
    pub use super::foundation::*;
    pub use super::integration::*;
}
