//! Shutdown coordination.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{broadcast, watch};
use tracing::Level;

use crate::bus::BusError;
use crate::environment::Environment;
use crate::lifecycle::signals::ShutdownSignal;
use crate::service::ServiceError;

/// Broadcast fired once shutdown begins.
///
/// Every start attempt receives a subscription so work that outlives its
/// startup window can wind down.
pub struct Shutdown {
    /// Broadcast channel sender.
    tx: broadcast::Sender<()>,
    triggered: AtomicBool,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            triggered: AtomicBool::new(false),
        }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
        let _ = self.tx.send(());
    }

    /// True once [`trigger`](Self::trigger) has been called. Unlike a
    /// subscription, this also sees triggers that happened earlier.
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Number of live subscriptions.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Process lifecycle phase. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecyclePhase {
    Running,
    ShuttingDown,
    Exited,
}

/// Outcome of a shutdown sweep.
#[derive(Debug, Default)]
pub struct ShutdownReport {
    pub signal: Option<ShutdownSignal>,
    pub stopped: Vec<String>,
    pub stop_failures: Vec<(String, ServiceError)>,
    pub bus_error: Option<BusError>,
}

impl ShutdownReport {
    /// True if every stop and the bus close succeeded.
    pub fn is_clean(&self) -> bool {
        self.stop_failures.is_empty() && self.bus_error.is_none()
    }

    /// Process exit status: 0 when clean, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.is_clean() {
            0
        } else {
            1
        }
    }
}

/// Stops every registered service and closes the bus, once.
pub struct ShutdownCoordinator {
    phase_tx: watch::Sender<LifecyclePhase>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (phase_tx, _) = watch::channel(LifecyclePhase::Running);
        Self { phase_tx }
    }

    /// Observe phase transitions.
    pub fn phase_receiver(&self) -> watch::Receiver<LifecyclePhase> {
        self.phase_tx.subscribe()
    }

    pub fn phase(&self) -> LifecyclePhase {
        *self.phase_tx.borrow()
    }

    /// Wait for the environment's signal handler, then shut down.
    pub async fn run(self, env: &Environment) -> ShutdownReport {
        let signal = env.signal_handler().wait().await;
        self.on_signal(env, signal).await
    }

    /// Shut down in response to a signal that was already received.
    pub async fn on_signal(self, env: &Environment, signal: ShutdownSignal) -> ShutdownReport {
        env.log(Level::INFO, &format!("Received signal: {}", signal));

        let mut report = self.shutdown(env).await;
        report.signal = Some(signal);
        report
    }

    /// Stop every registered service, then close the bus.
    ///
    /// A failing or panicking stop is logged and recorded; the sweep
    /// continues. A stop that never returns holds up the whole sweep.
    pub async fn shutdown(self, env: &Environment) -> ShutdownReport {
        self.advance(LifecyclePhase::ShuttingDown);
        env.shutdown().trigger();

        let mut report = ShutdownReport::default();
        let mut services: Vec<_> = env.all_services().into_iter().collect();
        services.sort_by(|a, b| a.0.cmp(&b.0));

        for (name, service) in services {
            let stopped = tokio::spawn(async move { service.stop().await })
                .await
                .unwrap_or_else(|e| {
                    Err(ServiceError::failed(format!("stop panicked: {}", e)))
                });

            match stopped {
                Ok(()) => {
                    tracing::debug!(name = %name, "Service stopped");
                    report.stopped.push(name);
                }
                Err(e) => {
                    env.log(
                        Level::ERROR,
                        &format!("Error stopping service {}: {}", name, e),
                    );
                    report.stop_failures.push((name, e));
                }
            }
        }

        if let Err(e) = env.bus().close() {
            env.log(Level::ERROR, &format!("Error closing bus: {}", e));
            report.bus_error = Some(e);
        }

        self.advance(LifecyclePhase::Exited);
        tracing::info!(
            stopped = report.stopped.len(),
            failed = report.stop_failures.len(),
            exit_code = report.exit_code(),
            "Shutdown complete"
        );
        report
    }

    fn advance(&self, next: LifecyclePhase) {
        self.phase_tx.send_if_modified(|phase| {
            if *phase < next {
                *phase = next;
                true
            } else {
                false
            }
        });
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_exit_code() {
        let mut report = ShutdownReport::default();
        assert_eq!(report.exit_code(), 0);

        report.bus_error = Some(BusError::BusClosed);
        assert_eq!(report.exit_code(), 1);

        let report = ShutdownReport {
            stop_failures: vec![("Hue".to_string(), ServiceError::NotRunning)],
            ..Default::default()
        };
        assert!(!report.is_clean());
        assert_eq!(report.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_empty_environment_shuts_down_cleanly() {
        let env = Environment::default();
        let coordinator = ShutdownCoordinator::new();
        let phases = coordinator.phase_receiver();
        assert_eq!(coordinator.phase(), LifecyclePhase::Running);

        let mut notified = env.shutdown().subscribe();
        let report = coordinator.shutdown(&env).await;

        assert!(report.is_clean());
        assert!(notified.try_recv().is_ok());
        assert_eq!(*phases.borrow(), LifecyclePhase::Exited);
    }

    #[test]
    fn test_shutdown_broadcast() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();
        assert_eq!(shutdown.receiver_count(), 1);
        assert!(!shutdown.is_triggered());
        shutdown.trigger();
        assert!(rx.try_recv().is_ok());
        assert!(shutdown.is_triggered());
    }
}
