//! # Structured Logging
//!
//! Installs the process-wide tracing subscriber used by every service in the
//! pipeline. Request correlation is carried by spans (`request_id` field)
//! rather than thread-local state, since a request hops between tokio worker
//! threads.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

// Flag to track if logging has been initialized
static LOGGING_INITIALIZED: AtomicBool = AtomicBool::new(false);

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to set global subscriber: {0}")]
    Subscriber(String),
}

/// Configuration for the logging system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// The log level to use (trace, debug, info, warn, error)
    pub level: String,
    /// The service name for identification
    pub service_name: String,
    /// Whether to use JSON formatting
    pub json_format: bool,
    /// Whether to include the event target
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            service_name: "unknown-service".to_string(),
            json_format: false,
            with_target: true,
        }
    }
}

impl LoggingConfig {
    /// Build a config for `service_name`, reading `LOG_LEVEL` and
    /// `LOG_FORMAT` (`json` or `text`) from the environment.
    pub fn from_env(service_name: &str) -> Self {
        let defaults = Self::default();
        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or(defaults.level),
            service_name: service_name.to_string(),
            json_format: std::env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(defaults.json_format),
            with_target: defaults.with_target,
        }
    }
}

/// Initializes the structured logging system
pub fn init_logging(config: Option<LoggingConfig>) -> Result<(), LoggingError> {
    // Don't re-initialize if already done
    if LOGGING_INITIALIZED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    let config = config.unwrap_or_default();

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},hyper=warn,reqwest=warn", config.level)));

    let subscriber = Registry::default().with(filter);

    // try_init also routes `log` records (config-rs) into tracing
    let result = if config.json_format {
        let json_layer = fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .with_target(config.with_target);
        subscriber.with(json_layer).try_init()
    } else {
        let text_layer = fmt::layer()
            .with_target(config.with_target)
            .with_thread_ids(true);
        subscriber.with(text_layer).try_init()
    };

    if let Err(e) = result {
        LOGGING_INITIALIZED.store(false, Ordering::SeqCst);
        return Err(LoggingError::Subscriber(e.to_string()));
    }

    tracing::info!(
        service = %config.service_name,
        level = %config.level,
        json = %config.json_format,
        "Structured logging initialized"
    );

    Ok(())
}
