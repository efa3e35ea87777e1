//! # Error Handling Framework
//!
//! Fault taxonomy and logging setup shared by the gateway and the three
//! pipeline stages.
//!
//! ## Features
//!
//! - `ErrorKind` / `ErrorInfo`: the attributable fault record embedded in
//!   result envelopes
//! - Structured logging initialization (text or JSON)

pub mod logging;
pub mod types;

// Re-export commonly used types
pub use logging::{init_logging, LoggingConfig, LoggingError};
pub use types::{ErrorInfo, ErrorKind};

/// Initializes logging for `service_name` from the environment
pub fn init(service_name: &str) -> std::result::Result<(), LoggingError> {
    init_logging(Some(LoggingConfig::from_env(service_name)))
}
