//! Logger provider abstraction.
//!
//! Components ask a [`Logging`] provider for a [`Logger`] keyed by their own
//! name, and only when they actually have something to say. This keeps
//! code paths that never log free of any provider interaction.
//!
//! The default provider, [`TracingLogging`], forwards every line to
//! `tracing` with the component name attached as the `logger` field.
//!
//! # Usage
//!
//! ```rust
//! use boltwire_core::logging::{Logging, TracingLogging};
//!
//! let logging = TracingLogging;
//! let log = logging.get_log("SocketConnection");
//! log.info("connected");
//! ```

use std::fmt;
use std::sync::Arc;

/// A named log sink.
pub trait Logger: Send + Sync {
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn debug(&self, message: &str);

    /// Whether debug lines would be emitted. Callers use this to skip
    /// building expensive debug output.
    fn is_debug_enabled(&self) -> bool;
}

/// Provider of [`Logger`]s keyed by component name.
pub trait Logging: Send + Sync {
    fn get_log(&self, name: &str) -> Arc<dyn Logger>;
}

impl fmt::Debug for dyn Logging {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Logging")
    }
}

/// Provider forwarding to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogging;

impl Logging for TracingLogging {
    fn get_log(&self, name: &str) -> Arc<dyn Logger> {
        Arc::new(TracingLogger {
            name: name.to_string(),
        })
    }
}

#[derive(Debug)]
struct TracingLogger {
    name: String,
}

impl Logger for TracingLogger {
    fn error(&self, message: &str) {
        tracing::error!(logger = %self.name, "{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(logger = %self.name, "{}", message);
    }

    fn info(&self, message: &str) {
        tracing::info!(logger = %self.name, "{}", message);
    }

    fn debug(&self, message: &str) {
        tracing::debug!(logger = %self.name, "{}", message);
    }

    fn is_debug_enabled(&self) -> bool {
        tracing::enabled!(tracing::Level::DEBUG)
    }
}

/// Provider that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLogging;

impl Logging for NoLogging {
    fn get_log(&self, _name: &str) -> Arc<dyn Logger> {
        Arc::new(NoLogger)
    }
}

#[derive(Debug)]
struct NoLogger;

impl Logger for NoLogger {
    fn error(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn debug(&self, _message: &str) {}

    fn is_debug_enabled(&self) -> bool {
        false
    }
}
