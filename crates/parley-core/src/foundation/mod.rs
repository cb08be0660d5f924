//! Foundation layer: the event model and error taxonomy.

pub mod error;
pub mod event;

pub use error::{
    EngineError, EngineResult, MemoryError, MemoryResult, TransportError, TransportResult,
};
pub use event::{Event, Predicate};
