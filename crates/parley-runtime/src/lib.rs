//! # Parley Runtime
//!
//! Startup and lifecycle for Parley bots.
//!
//! This crate provides:
//! - Layered configuration ([`ConfigLoader`], [`ParleyConfig`])
//! - Logging setup ([`LoggingBuilder`])
//! - Engine and memory selection by name, script loading and shutdown
//!   handling ([`ParleyRuntime`])
//!
//! ```rust,ignore
//! use parley_runtime::ParleyRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = ParleyRuntime::builder().build()?;
//!     runtime
//!         .register_engine::<ConsoleEngine>()
//!         .register_script(my_script());
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{
    ConfigError, ConfigLoader, ConfigResult, LogFormat, LogLevel, LogOutput, LoggingConfig,
    ParleyConfig, Profile,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{ParleyRuntime, RuntimeBuilder};

pub use tracing;

/// Logging macros for scripts.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
