//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Supervisor + services:
//!     → Logger capability (logging.rs)
//!     → TracingLogger → tracing subscriber (stdout)
//!
//! Message bus:
//!     → BrokerLogEvent
//!     → BrokerLogFilter (broker.rs) drops routine client churn
//!     → Logger capability
//! ```
//!
//! # Design Decisions
//! - Services log through the injected `Logger`, never through globals
//! - Log level configurable via `Debug` and `RUST_LOG`

pub mod broker;
pub mod logging;

pub use broker::{BrokerLogFilter, BrokerLogger};
pub use logging::{init_tracing, Logger, TracingLogger};
