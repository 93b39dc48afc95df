//! Process-level errors.

use thiserror::Error;

use crate::bus::BusError;
use crate::config::ConfigError;

/// Failures that abort the process before or outside orchestration.
#[derive(Debug, Error)]
pub enum CasaError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to create message bus: {0}")]
    Bus(#[from] BusError),

    #[error("failed to build runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("failed to encode config as JSON: {0}")]
    Json(#[from] serde_json::Error),
}
