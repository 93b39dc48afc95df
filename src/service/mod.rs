//! Pluggable services.
//!
//! # Data Flow
//! ```text
//! manifest.rs (static list of built-in services)
//!     → registry.rs (name → Service, reader–writer locked)
//!     → lifecycle::startup (use_logger, start with a ConfigView)
//!     → lifecycle::shutdown (stop)
//! ```
//!
//! # Design Decisions
//! - The supervisor never inspects service internals, only this trait
//! - Registration is explicit; nothing registers itself on load
//! - One error type covers both start and stop failures

pub mod logger;
pub mod manifest;
pub mod registry;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::bus::BusError;
use crate::config::{ConfigError, ConfigView};
use crate::observability::Logger;

pub use logger::LoggerService;
pub use registry::ServiceRegistry;

/// Errors returned by [`Service::start`] and [`Service::stop`].
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error("service is already running")]
    AlreadyRunning,

    #[error("service is not running")]
    NotRunning,

    #[error("{0}")]
    Failed(String),
}

impl ServiceError {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }
}

/// Result type for service operations.
pub type ServiceResult<T = ()> = Result<T, ServiceError>;

/// A unit of functionality managed by the supervisor.
#[async_trait]
pub trait Service: Send + Sync {
    /// Start the service.
    ///
    /// `config` is the service's own section with the global `MQTT` section
    /// merged in. `shutdown` fires when the process begins shutting down;
    /// long-running start work should give up when it does.
    async fn start(&self, config: ConfigView, shutdown: broadcast::Receiver<()>) -> ServiceResult;

    /// Set the logger to use from now on.
    fn use_logger(&self, logger: Arc<dyn Logger>);

    /// Stop the service.
    async fn stop(&self) -> ServiceResult;
}
