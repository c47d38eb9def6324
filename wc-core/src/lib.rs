//! WidgetChat Core - Foundation types, error handling, configuration, and logging.
//!
//! This crate provides the shared foundation used by all other WidgetChat crates:
//! - SDK configuration (backend endpoints, realtime tuning, logging)
//! - The error taxonomy surfaced to callers, plus a unified `WcError`
//! - Structured logging with tracing
//! - Platform paths and common constants

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod platform;

// Re-export commonly used items at the crate root
pub use config::SdkConfig;
pub use error::{
    ConfigError, ConnError, InitError, PresentError, ThemeError, ValidationError, WcError,
    WcResult,
};
pub use logging::init_logging;
pub use platform::Platform;
