//! Casa: a process supervisor for a pluggable home automation runtime.
//!
//! # Architecture Overview
//!
//! ```text
//!   main ──▶ config::loader ──▶ Environment (composition root)
//!                                 │  config store · bus · logger
//!                                 │  signal handler · service registry
//!                                 ▼
//!              lifecycle::startup ──▶ Service::start (one task each, 1s window)
//!                                 │
//!   SIGINT/SIGTERM ──▶ lifecycle::shutdown ──▶ Service::stop ──▶ bus close ──▶ exit
//! ```

pub mod bus;
pub mod config;
pub mod environment;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod server;
pub mod service;

pub use environment::{EnvOption, Environment};
pub use error::CasaError;
pub use lifecycle::{ShutdownCoordinator, StartupOrchestrator};
pub use service::{Service, ServiceError, ServiceRegistry};
