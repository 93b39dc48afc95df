//! Startup orchestration.
//!
//! # Responsibilities
//! - Walk the configured services and skip disabled ones
//! - Build a per-service config view (service section + `MQTT`)
//! - Inject the logger and start each service in its own task
//! - Wait at most the startup timeout per service, then move on
//!
//! # Design Decisions
//! - Per-service failures are logged, never fatal
//! - No ordering between services may be relied on
//! - Once shutdown has been triggered no further service is started
//! - A start that outlives its window keeps running; its late result is
//!   logged at debug level and otherwise ignored

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::Level;

use crate::config::ConfigView;
use crate::environment::Environment;
use crate::service::{Service, ServiceError, ServiceResult};

/// How long each service gets to report back from `start`.
pub const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(1);

/// What happened to each configured service during one startup pass.
#[derive(Debug, Default)]
pub struct StartupReport {
    pub started: Vec<String>,
    pub failed: Vec<(String, ServiceError)>,
    pub timed_out: Vec<String>,
    pub unsupported: Vec<String>,
    pub disabled: Vec<String>,
}

impl StartupReport {
    /// Number of services that were enabled in configuration.
    pub fn attempted(&self) -> usize {
        self.started.len() + self.failed.len() + self.timed_out.len() + self.unsupported.len()
    }
}

enum StartOutcome {
    Started,
    Failed(ServiceError),
    TimedOut,
}

/// Brings up every enabled service.
pub struct StartupOrchestrator {
    timeout: Duration,
}

impl StartupOrchestrator {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_START_TIMEOUT,
        }
    }

    /// Override the per-service startup window.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Start every enabled service in the current configuration snapshot.
    pub async fn start_all(&self, env: &Environment) -> StartupReport {
        let config = env.config();
        let mut report = StartupReport::default();

        for (name, section) in &config.services {
            if env.shutdown().is_triggered() {
                env.log(
                    Level::INFO,
                    "Shutdown in progress, not starting remaining services",
                );
                break;
            }

            if !section.enabled {
                report.disabled.push(name.clone());
                continue;
            }

            let view = ConfigView::for_service(&config, name);

            let Some(service) = env.get_service(name) else {
                env.log(Level::WARN, &format!("Unsupported service: {}", name));
                report.unsupported.push(name.clone());
                continue;
            };

            service.use_logger(env.logger().clone());
            env.log(Level::INFO, &format!("Starting service: {}", name));

            match self.start_one(env, name, service, view).await {
                StartOutcome::Started => {
                    env.log(Level::INFO, &format!("Service started: {}", name));
                    report.started.push(name.clone());
                }
                StartOutcome::Failed(e) => {
                    env.log(
                        Level::ERROR,
                        &format!("Failed starting service {}: {}", name, e),
                    );
                    report.failed.push((name.clone(), e));
                }
                StartOutcome::TimedOut => {
                    env.log(
                        Level::WARN,
                        &format!("Timeout while starting service: {}", name),
                    );
                    report.timed_out.push(name.clone());
                }
            }
        }

        tracing::info!(
            started = report.started.len(),
            failed = report.failed.len(),
            timed_out = report.timed_out.len(),
            unsupported = report.unsupported.len(),
            "Startup pass complete"
        );
        report
    }

    async fn start_one(
        &self,
        env: &Environment,
        name: &str,
        service: Arc<dyn Service>,
        view: ConfigView,
    ) -> StartOutcome {
        let (tx, mut rx) = oneshot::channel::<ServiceResult>();
        let shutdown = env.shutdown().subscribe();

        tokio::spawn(async move {
            let _ = tx.send(service.start(view, shutdown).await);
        });

        match tokio::time::timeout(self.timeout, &mut rx).await {
            Ok(Ok(Ok(()))) => StartOutcome::Started,
            Ok(Ok(Err(e))) => StartOutcome::Failed(e),
            Ok(Err(_)) => StartOutcome::Failed(ServiceError::failed(
                "start task ended without reporting a result",
            )),
            Err(_) => {
                let logger = env.logger().clone();
                let name = name.to_string();
                tokio::spawn(async move {
                    match rx.await {
                        Ok(Ok(())) => logger.debug(&format!(
                            "Service {} finished starting after the startup timeout",
                            name
                        )),
                        Ok(Err(e)) => logger.debug(&format!(
                            "Service {} failed after the startup timeout: {}",
                            name, e
                        )),
                        Err(_) => {}
                    }
                });
                StartOutcome::TimedOut
            }
        }
    }
}

impl Default for StartupOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}
