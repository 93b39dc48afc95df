//! Process composition root.
//!
//! # Responsibilities
//! - Aggregate configuration, message bus, logger, signal handler and
//!   service registry into one handle
//! - Replace every absent collaborator with its null default
//! - Own the shutdown broadcast handed to every start attempt
//!
//! # Design Decisions
//! - Built once in `main` and passed by reference; there is no global
//! - Options may be applied in several stages while wiring (logger first,
//!   bus once it exists); after that the environment is read-mostly
//! - The registry is referenced, not owned, and may be absent: registry
//!   operations on an absent registry are no-ops

mod nulls;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::Level;

use crate::bus::MessageBus;
use crate::config::{CasaConfig, ConfigStore};
use crate::lifecycle::signals::SignalHandler;
use crate::lifecycle::Shutdown;
use crate::observability::Logger;
use crate::service::{Service, ServiceRegistry};

pub use nulls::{NullBrokerLogger, NullLogger, NullMessageBus, NullSignalHandler};

/// A wiring step applied by [`Environment::new`] or [`Environment::with_options`].
pub enum EnvOption {
    Logger(Arc<dyn Logger>),
    Bus(Arc<dyn MessageBus>),
    SignalHandler(Arc<dyn SignalHandler>),
    Config(Arc<ConfigStore>),
    /// `None` detaches the registry.
    Registry(Option<Arc<ServiceRegistry>>),
}

/// Shared collaborators for orchestration and services.
pub struct Environment {
    config: Arc<ConfigStore>,
    bus: Arc<dyn MessageBus>,
    logger: Arc<dyn Logger>,
    signals: Arc<dyn SignalHandler>,
    registry: Option<Arc<ServiceRegistry>>,
    shutdown: Shutdown,
}

impl Environment {
    /// Build an environment with a fresh registry and null defaults, then
    /// apply `options`.
    pub fn new(options: impl IntoIterator<Item = EnvOption>) -> Self {
        let mut env = Self {
            config: Arc::new(ConfigStore::default()),
            bus: Arc::new(NullMessageBus),
            logger: Arc::new(NullLogger),
            signals: Arc::new(NullSignalHandler),
            registry: Some(Arc::new(ServiceRegistry::new())),
            shutdown: Shutdown::new(),
        };
        env.with_options(options);
        env
    }

    /// Apply further wiring steps.
    pub fn with_options(&mut self, options: impl IntoIterator<Item = EnvOption>) -> &mut Self {
        for option in options {
            match option {
                EnvOption::Logger(logger) => self.logger = logger,
                EnvOption::Bus(bus) => self.bus = bus,
                EnvOption::SignalHandler(handler) => self.signals = handler,
                EnvOption::Config(config) => self.config = config,
                EnvOption::Registry(registry) => self.registry = registry,
            }
        }
        self
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> Arc<CasaConfig> {
        self.config.load()
    }

    pub fn config_store(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    pub fn bus(&self) -> &Arc<dyn MessageBus> {
        &self.bus
    }

    pub fn logger(&self) -> &Arc<dyn Logger> {
        &self.logger
    }

    pub fn signal_handler(&self) -> &Arc<dyn SignalHandler> {
        &self.signals
    }

    pub fn registry(&self) -> Option<&Arc<ServiceRegistry>> {
        self.registry.as_ref()
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    pub fn log(&self, level: Level, message: &str) {
        self.logger.log(level, message);
    }

    pub fn register_service(&self, name: impl Into<String>, service: Arc<dyn Service>) {
        if let Some(registry) = &self.registry {
            registry.register(name, service);
        }
    }

    pub fn remove_service(&self, name: &str) {
        if let Some(registry) = &self.registry {
            registry.remove(name);
        }
    }

    pub fn get_service(&self, name: &str) -> Option<Arc<dyn Service>> {
        self.registry.as_ref()?.get(name)
    }

    pub fn all_services(&self) -> HashMap<String, Arc<dyn Service>> {
        self.registry
            .as_ref()
            .map(|registry| registry.all())
            .unwrap_or_default()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new([])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::LocalBus;
    use crate::config::MqttConfig;
    use crate::service::LoggerService;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Lines(Mutex<Vec<String>>);

    impl Logger for Lines {
        fn log(&self, _level: Level, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    #[test]
    fn test_defaults_are_callable() {
        let env = Environment::default();
        env.log(Level::INFO, "discarded");
        assert!(env.bus().new_client().is_none());
        assert!(env.bus().close().is_ok());
        assert!(env.config().services.is_empty());
        assert!(env.registry().is_some());
    }

    #[test]
    fn test_staged_wiring() {
        let lines = Arc::new(Lines::default());
        let mut env = Environment::new([EnvOption::Logger(lines.clone())]);
        env.log(Level::INFO, "first stage");

        let bus = Arc::new(LocalBus::bind(&MqttConfig::default()).unwrap());
        env.with_options([EnvOption::Bus(bus.clone())]);

        let client = env.bus().new_client();
        assert!(client.is_some());
        assert_eq!(bus.client_count(), 1);
        env.log(Level::INFO, "second stage");
        assert_eq!(*lines.0.lock().unwrap(), vec!["first stage", "second stage"]);
    }

    #[test]
    fn test_shared_registry() {
        let registry = Arc::new(ServiceRegistry::new());
        let env = Environment::new([EnvOption::Registry(Some(registry.clone()))]);
        env.register_service("Logger", Arc::new(LoggerService::new(env.bus().clone())));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_detached_registry_is_a_no_op() {
        let env = Environment::new([EnvOption::Registry(None)]);
        env.register_service("Logger", Arc::new(LoggerService::new(env.bus().clone())));
        env.remove_service("Logger");
        env.remove_service("Missing");

        assert!(env.registry().is_none());
        assert!(env.get_service("Logger").is_none());
        assert!(env.all_services().is_empty());
    }
}
