//! Configuration for the Parley runtime.
//!
//! Settings are layered with `figment` from defaults, config files,
//! `PARLEY_*` environment variables and programmatic overrides.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile};
pub use schema::{LogFormat, LogLevel, LogOutput, LoggingConfig, ParleyConfig, SpanEventConfig};
pub use validation::validate_config;
