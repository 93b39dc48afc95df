//! Inert stand-ins for optional collaborators.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::Level;

use crate::bus::{BusError, MessageBus, MessageClient};
use crate::lifecycle::signals::{ShutdownSignal, SignalHandler};
use crate::observability::broker::{BrokerLogEvent, BrokerLogger};
use crate::observability::Logger;

/// Bus that never fails and never hands out a client.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMessageBus;

impl MessageBus for NullMessageBus {
    fn close(&self) -> Result<(), BusError> {
        Ok(())
    }

    fn new_client(&self) -> Option<Arc<dyn MessageClient>> {
        None
    }
}

/// Logger that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _level: Level, _message: &str) {}
}

/// Broker logger that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBrokerLogger;

impl BrokerLogger for NullBrokerLogger {
    fn log(&self, _event: &BrokerLogEvent) {}
}

/// Signal handler that never reports a signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSignalHandler;

#[async_trait]
impl SignalHandler for NullSignalHandler {
    async fn wait(&self) -> ShutdownSignal {
        std::future::pending().await
    }
}
