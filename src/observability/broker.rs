//! Broker log filtering.
//!
//! Transport-layer events pass through [`BrokerLogFilter`] before reaching
//! the [`Logger`]. Network drops and ordinary connection closes happen all
//! the time (mobile clients come and go) and are suppressed; every other
//! error is forwarded once.

use std::fmt;
use std::sync::Arc;

use super::logging::Logger;

/// What the broker was doing when it reported the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerEventKind {
    NewConnection,
    LostConnection,
    MessagePublished,
    Subscribed,
    Unsubscribed,
}

/// Transport failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorCode {
    DialError,
    LaunchError,
    EncodeError,
    DecodeError,
    DetectionError,
    ConnectionClose,
    NetworkError,
}

impl TransportErrorCode {
    /// Codes produced by routine client churn.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::NetworkError | Self::ConnectionClose)
    }
}

impl fmt::Display for TransportErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Error attached to a broker event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    Transport {
        code: TransportErrorCode,
        detail: String,
    },
    Other(String),
}

/// A single event reported by the message broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerLogEvent {
    pub kind: BrokerEventKind,
    pub client: Option<u64>,
    pub error: Option<BrokerError>,
}

/// Sink for broker events.
pub trait BrokerLogger: Send + Sync {
    fn log(&self, event: &BrokerLogEvent);
}

/// Stateless filter in front of a [`Logger`].
pub struct BrokerLogFilter {
    logger: Arc<dyn Logger>,
}

impl BrokerLogFilter {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self { logger }
    }
}

impl BrokerLogger for BrokerLogFilter {
    fn log(&self, event: &BrokerLogEvent) {
        match &event.error {
            None => {}
            Some(BrokerError::Transport { code, .. }) if code.is_transient() => {}
            Some(BrokerError::Transport { code, detail }) => {
                self.logger
                    .error(&format!("Transport error {}: {}", code, detail));
            }
            Some(BrokerError::Other(detail)) => self.logger.error(detail),
        }
    }
}
