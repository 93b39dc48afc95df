//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Define the `Logger` capability handed to services
//! - Bridge `Logger` calls onto tracing events

use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// A way to report messages to the user. Fire-and-forget.
pub trait Logger: Send + Sync {
    fn log(&self, level: Level, message: &str);

    fn debug(&self, message: &str) {
        self.log(Level::DEBUG, message);
    }

    fn info(&self, message: &str) {
        self.log(Level::INFO, message);
    }

    fn warn(&self, message: &str) {
        self.log(Level::WARN, message);
    }

    fn error(&self, message: &str) {
        self.log(Level::ERROR, message);
    }
}

/// [`Logger`] that re-emits every call as a tracing event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: Level, message: &str) {
        if level == Level::ERROR {
            tracing::error!(target: "casa", "{}", message);
        } else if level == Level::WARN {
            tracing::warn!(target: "casa", "{}", message);
        } else if level == Level::INFO {
            tracing::info!(target: "casa", "{}", message);
        } else if level == Level::DEBUG {
            tracing::debug!(target: "casa", "{}", message);
        } else {
            tracing::trace!(target: "casa", "{}", message);
        }
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the `debug` default.
///
/// Does nothing if a subscriber is already installed.
pub fn init_tracing(debug: bool) {
    let default_filter = if debug { "casa=debug" } else { "casa=info" };

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
