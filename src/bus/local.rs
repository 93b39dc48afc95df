//! In-process message bus.
//!
//! # Responsibilities
//! - Validate the configured listen address
//! - Hand out clients and track their subscriptions
//! - Route published messages to matching subscribers
//! - Keep retained messages and replay them to new subscriptions
//! - Report client churn to a broker logger

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;

use super::topic::{matches, validate_filter, validate_topic};
use super::{BusError, Message, MessageBus, MessageClient, MessageHandler};
use crate::config::MqttConfig;
use crate::environment::NullBrokerLogger;
use crate::observability::broker::{
    BrokerError, BrokerEventKind, BrokerLogEvent, BrokerLogger, TransportErrorCode,
};

const SCHEMES: [&str; 4] = ["tcp", "tls", "ws", "wss"];

/// A parsed `MQTT.Listen` value such as `tcp://:1883`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenAddr {
    pub scheme: String,
    /// IP literal or DNS name. `0.0.0.0` when the address names no host.
    pub host: String,
    pub port: u16,
}

impl ListenAddr {
    /// Parse `<scheme>://[host]:<port>`. An empty host binds all interfaces.
    ///
    /// Host names are checked for shape only; resolving them is left to
    /// the listener.
    pub fn parse(raw: &str) -> Result<Self, BusError> {
        let invalid = |reason: &str| BusError::InvalidListenAddress {
            address: raw.to_string(),
            reason: reason.to_string(),
        };

        let (scheme, rest) = raw
            .split_once("://")
            .ok_or_else(|| invalid("missing scheme"))?;
        let scheme = scheme.to_ascii_lowercase();
        if !SCHEMES.contains(&scheme.as_str()) {
            return Err(invalid("unsupported scheme"));
        }

        let (host, port) = rest.rsplit_once(':').ok_or_else(|| invalid("missing port"))?;
        let port: u16 = port.parse().map_err(|_| invalid("invalid port"))?;

        let host = if let Some(bracketed) = host.strip_prefix('[') {
            let inner = bracketed
                .strip_suffix(']')
                .ok_or_else(|| invalid("invalid host"))?;
            inner
                .parse::<Ipv6Addr>()
                .map_err(|_| invalid("invalid host"))?
                .to_string()
        } else if host.is_empty() {
            Ipv4Addr::UNSPECIFIED.to_string()
        } else if host.parse::<IpAddr>().is_ok() || is_hostname(host) {
            host.to_ascii_lowercase()
        } else {
            return Err(invalid("invalid host"));
        };

        Ok(Self { scheme, host, port })
    }
}

/// RFC 1123 shape: dot-separated labels of letters, digits and inner hyphens.
fn is_hostname(host: &str) -> bool {
    host.len() <= 253
        && host.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
        })
}

impl fmt::Display for ListenAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "{}://[{}]:{}", self.scheme, self.host, self.port)
        } else {
            write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
        }
    }
}

/// In-process [`MessageBus`].
#[derive(Clone)]
pub struct LocalBus {
    inner: Arc<BusInner>,
}

struct BusInner {
    listen: ListenAddr,
    clients: DashMap<u64, Arc<ClientShared>>,
    retained: DashMap<String, Message>,
    next_id: AtomicU64,
    closed: AtomicBool,
    broker_logger: Arc<dyn BrokerLogger>,
}

struct ClientShared {
    id: u64,
    subscriptions: Mutex<Vec<String>>,
    handler: Mutex<Option<MessageHandler>>,
    closed: AtomicBool,
}

impl ClientShared {
    fn handler(&self) -> Option<MessageHandler> {
        self.handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn is_subscribed(&self, topic: &str) -> bool {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|filter| matches(filter, topic))
    }
}

impl LocalBus {
    /// Build a bus from the `MQTT` configuration section.
    pub fn bind(config: &MqttConfig) -> Result<Self, BusError> {
        Self::bind_with_logger(config, Arc::new(NullBrokerLogger))
    }

    /// Build a bus that reports client churn to `broker_logger`.
    pub fn bind_with_logger(
        config: &MqttConfig,
        broker_logger: Arc<dyn BrokerLogger>,
    ) -> Result<Self, BusError> {
        let listen = ListenAddr::parse(&config.listen)?;
        tracing::info!(listen = %listen, "Message bus ready");

        Ok(Self {
            inner: Arc::new(BusInner {
                listen,
                clients: DashMap::new(),
                retained: DashMap::new(),
                next_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
                broker_logger,
            }),
        })
    }

    /// The validated listen address.
    pub fn listen_addr(&self) -> &ListenAddr {
        &self.inner.listen
    }

    /// Number of connected clients.
    pub fn client_count(&self) -> usize {
        self.inner.clients.len()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

impl BusInner {
    fn emit(&self, kind: BrokerEventKind, client: Option<u64>, error: Option<BrokerError>) {
        self.broker_logger.log(&BrokerLogEvent {
            kind,
            client,
            error,
        });
    }

    fn route(&self, message: &Message) {
        if message.retain {
            if message.payload.is_empty() {
                self.retained.remove(&message.topic);
            } else {
                self.retained.insert(message.topic.clone(), message.clone());
            }
        }

        // Collect first so no map guard is held while handlers run.
        let targets: Vec<Arc<ClientShared>> = self
            .clients
            .iter()
            .filter(|entry| entry.value().is_subscribed(&message.topic))
            .map(|entry| entry.value().clone())
            .collect();

        for client in targets {
            if let Some(handler) = client.handler() {
                handler(Ok(message));
            }
        }
    }

    fn retained_matching(&self, filter: &str) -> Vec<Message> {
        self.retained
            .iter()
            .filter(|entry| matches(filter, entry.key()))
            .map(|entry| entry.value().clone())
            .collect()
    }
}

impl MessageBus for LocalBus {
    fn close(&self) -> Result<(), BusError> {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return Err(BusError::BusClosed);
        }

        let ids: Vec<u64> = self.inner.clients.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            if let Some((_, client)) = self.inner.clients.remove(&id) {
                client.closed.store(true, Ordering::SeqCst);
                if let Some(handler) = client.handler() {
                    handler(Err(&BusError::BusClosed));
                }
                self.inner.emit(
                    BrokerEventKind::LostConnection,
                    Some(id),
                    Some(BrokerError::Transport {
                        code: TransportErrorCode::ConnectionClose,
                        detail: "bus shutting down".to_string(),
                    }),
                );
            }
        }
        self.inner.retained.clear();

        tracing::info!(listen = %self.inner.listen, "Message bus closed");
        Ok(())
    }

    fn new_client(&self) -> Option<Arc<dyn MessageClient>> {
        if self.is_closed() {
            return None;
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let shared = Arc::new(ClientShared {
            id,
            subscriptions: Mutex::new(Vec::new()),
            handler: Mutex::new(None),
            closed: AtomicBool::new(false),
        });
        self.inner.clients.insert(id, shared.clone());
        self.inner.emit(BrokerEventKind::NewConnection, Some(id), None);

        Some(Arc::new(LocalClient {
            bus: self.inner.clone(),
            shared,
        }))
    }
}

/// A client connected to a [`LocalBus`].
pub struct LocalClient {
    bus: Arc<BusInner>,
    shared: Arc<ClientShared>,
}

impl LocalClient {
    fn ensure_open(&self) -> Result<(), BusError> {
        if self.bus.closed.load(Ordering::SeqCst) {
            return Err(BusError::BusClosed);
        }
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(BusError::ClientClosed);
        }
        Ok(())
    }
}

impl MessageClient for LocalClient {
    fn handle(&self, handler: MessageHandler) {
        *self
            .shared
            .handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handler);
    }

    fn publish_message(&self, message: Message) -> Result<(), BusError> {
        self.ensure_open()?;
        validate_topic(&message.topic)?;

        self.bus.route(&message);
        self.bus
            .emit(BrokerEventKind::MessagePublished, Some(self.shared.id), None);
        Ok(())
    }

    fn subscribe(&self, topic: &str) -> Result<(), BusError> {
        self.ensure_open()?;
        validate_filter(topic)?;

        {
            let mut subscriptions = self
                .shared
                .subscriptions
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if !subscriptions.iter().any(|existing| existing == topic) {
                subscriptions.push(topic.to_string());
            }
        }
        self.bus
            .emit(BrokerEventKind::Subscribed, Some(self.shared.id), None);

        let retained = self.bus.retained_matching(topic);
        if let Some(handler) = self.shared.handler() {
            for message in &retained {
                handler(Ok(message));
            }
        }
        Ok(())
    }

    fn unsubscribe(&self, topic: &str) -> Result<(), BusError> {
        self.ensure_open()?;

        self.shared
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|existing| existing != topic);
        self.bus
            .emit(BrokerEventKind::Unsubscribed, Some(self.shared.id), None);
        Ok(())
    }

    fn close(&self) -> Result<(), BusError> {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return Err(BusError::ClientClosed);
        }

        if self.bus.clients.remove(&self.shared.id).is_some() {
            self.bus
                .emit(BrokerEventKind::LostConnection, Some(self.shared.id), None);
        }
        Ok(())
    }
}

impl Drop for LocalClient {
    fn drop(&mut self) {
        if !self.shared.closed.swap(true, Ordering::SeqCst)
            && self.bus.clients.remove(&self.shared.id).is_some()
        {
            self.bus
                .emit(BrokerEventKind::LostConnection, Some(self.shared.id), None);
        }
    }
}
