//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use casa::config::{CasaConfig, ConfigStore, ConfigView, ServiceSection};
use casa::observability::Logger;
use casa::service::{Service, ServiceError, ServiceResult};
use casa::{EnvOption, Environment};
use tokio::sync::broadcast;
use tracing::Level;

/// Logger that keeps every line.
#[derive(Default)]
pub struct RecordingLogger {
    lines: Mutex<Vec<(Level, String)>>,
}

impl RecordingLogger {
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .map(|(_, line)| line.clone())
            .collect()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.lines().iter().filter(|line| line.contains(needle)).count()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.count_containing(needle) > 0
    }
}

impl Logger for RecordingLogger {
    fn log(&self, level: Level, message: &str) {
        self.lines.lock().unwrap().push((level, message.to_string()));
    }
}

pub enum StartBehavior {
    Succeed,
    Fail(&'static str),
    /// Sleep, then succeed.
    Delay(Duration),
    /// Block until the shutdown broadcast fires.
    UntilShutdown,
    Panic,
}

pub enum StopBehavior {
    Succeed,
    Fail(&'static str),
    /// Sleep, then succeed.
    Delay(Duration),
    Panic,
}

/// Scripted service that counts calls.
pub struct MockService {
    start: StartBehavior,
    stop: StopBehavior,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub start_returned: AtomicBool,
    pub saw_shutdown: AtomicBool,
    pub has_logger: AtomicBool,
    pub last_view: Mutex<Option<ConfigView>>,
}

impl MockService {
    pub fn new(start: StartBehavior, stop: StopBehavior) -> Arc<Self> {
        Arc::new(Self {
            start,
            stop,
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            start_returned: AtomicBool::new(false),
            saw_shutdown: AtomicBool::new(false),
            has_logger: AtomicBool::new(false),
            last_view: Mutex::new(None),
        })
    }

    pub fn ok() -> Arc<Self> {
        Self::new(StartBehavior::Succeed, StopBehavior::Succeed)
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn view(&self) -> Option<ConfigView> {
        self.last_view.lock().unwrap().clone()
    }
}

#[async_trait]
impl Service for MockService {
    async fn start(&self, config: ConfigView, mut shutdown: broadcast::Receiver<()>) -> ServiceResult {
        self.starts.fetch_add(1, Ordering::SeqCst);
        *self.last_view.lock().unwrap() = Some(config);

        let result = match &self.start {
            StartBehavior::Succeed => Ok(()),
            StartBehavior::Fail(reason) => Err(ServiceError::failed(*reason)),
            StartBehavior::Delay(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(())
            }
            StartBehavior::UntilShutdown => {
                let _ = shutdown.recv().await;
                self.saw_shutdown.store(true, Ordering::SeqCst);
                Err(ServiceError::failed("shut down before ready"))
            }
            StartBehavior::Panic => panic!("start exploded"),
        };

        self.start_returned.store(true, Ordering::SeqCst);
        result
    }

    fn use_logger(&self, _logger: Arc<dyn Logger>) {
        self.has_logger.store(true, Ordering::SeqCst);
    }

    async fn stop(&self) -> ServiceResult {
        self.stops.fetch_add(1, Ordering::SeqCst);
        match &self.stop {
            StopBehavior::Succeed => Ok(()),
            StopBehavior::Fail(reason) => Err(ServiceError::failed(*reason)),
            StopBehavior::Delay(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(())
            }
            StopBehavior::Panic => panic!("stop exploded"),
        }
    }
}

/// Configuration with only the given `(name, enabled)` service sections.
pub fn config_with(services: &[(&str, bool)]) -> CasaConfig {
    let mut config = CasaConfig::without_services();
    config.mqtt.listen = "tcp://127.0.0.1:18830".to_string();
    for (name, enabled) in services {
        config
            .services
            .insert(name.to_string(), ServiceSection::new(*enabled));
    }
    config
}

/// Environment with a recording logger and the given configuration.
pub fn environment(config: CasaConfig) -> (Environment, Arc<RecordingLogger>) {
    let logger = Arc::new(RecordingLogger::default());
    let env = Environment::new([
        EnvOption::Logger(logger.clone()),
        EnvOption::Config(Arc::new(ConfigStore::new(config))),
    ]);
    (env, logger)
}

/// Poll `check` until it holds or `limit` passes.
pub async fn eventually<F: Fn() -> bool>(limit: Duration, check: F) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
