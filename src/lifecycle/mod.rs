//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config snapshot → enabled services → registry lookup
//!         → use_logger → start (own task) → race against 1s timeout
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast shutdown → stop every service
//!         → close bus → exit status
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → one-shot shutdown trigger
//! ```
//!
//! # Design Decisions
//! - A slow or failing service never blocks the others from starting
//! - Timed-out start attempts are not cancelled; their late result is
//!   logged and discarded
//! - Stop calls run one after another with no timeout
//! - Shutdown is one-way: Running → ShuttingDown → Exited

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{LifecyclePhase, Shutdown, ShutdownCoordinator, ShutdownReport};
pub use signals::{ManualSignal, OsSignalHandler, ShutdownSignal, SignalHandler};
pub use startup::{StartupOrchestrator, StartupReport, DEFAULT_START_TIMEOUT};
