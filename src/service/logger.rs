//! Built-in `Logger` service: logs every message seen on the bus.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::{Service, ServiceError, ServiceResult};
use crate::bus::{BusError, Message, MessageBus, MessageClient};
use crate::config::ConfigView;
use crate::environment::NullLogger;
use crate::observability::Logger;

/// Subscribes to `Topics` (default `#`) and logs each message.
pub struct LoggerService {
    bus: Arc<dyn MessageBus>,
    logger: Mutex<Arc<dyn Logger>>,
    client: Mutex<Option<Arc<dyn MessageClient>>>,
}

impl LoggerService {
    pub const NAME: &'static str = "Logger";

    pub fn new(bus: Arc<dyn MessageBus>) -> Self {
        Self {
            bus,
            logger: Mutex::new(Arc::new(NullLogger)),
            client: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn logger(&self) -> Arc<dyn Logger> {
        self.logger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Service for LoggerService {
    async fn start(&self, config: ConfigView, _shutdown: broadcast::Receiver<()>) -> ServiceResult {
        let topics = config
            .get_string_list("Topics")
            .filter(|topics| !topics.is_empty())
            .unwrap_or_else(|| vec!["#".to_string()]);

        let mut slot = self.client.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Err(ServiceError::AlreadyRunning);
        }

        let client = self.bus.new_client().ok_or(BusError::NoClient)?;
        let logger = self.logger();
        client.handle(Arc::new(move |delivery: Result<&Message, &BusError>| {
            match delivery {
                Ok(message) => logger.info(&message.to_string()),
                Err(e) => logger.warn(&format!("Message bus error: {}", e)),
            }
        }));

        for topic in &topics {
            if let Err(e) = client.subscribe(topic) {
                let _ = client.close();
                return Err(e.into());
            }
        }

        tracing::debug!(topics = ?topics, "Logger service subscribed");
        *slot = Some(client);
        Ok(())
    }

    fn use_logger(&self, logger: Arc<dyn Logger>) {
        *self.logger.lock().unwrap_or_else(PoisonError::into_inner) = logger;
    }

    async fn stop(&self) -> ServiceResult {
        let client = self
            .client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match client {
            None => Ok(()),
            Some(client) => match client.close() {
                Ok(()) | Err(BusError::ClientClosed) | Err(BusError::BusClosed) => Ok(()),
                Err(e) => Err(e.into()),
            },
        }
    }
}
