//! Message transport abstraction.
//!
//! # Data Flow
//! ```text
//! Service
//!     → MessageBus::new_client() (one client per owner)
//!     → MessageClient::subscribe(filter) / publish_message(msg)
//!     → bus routes msg to every client whose filter matches (topic.rs)
//!     → MessageClient handler callback
//! ```
//!
//! # Design Decisions
//! - The bus is a capability: services see only the traits below
//! - Clients are owned and explicitly closed by whoever created them
//! - `local.rs` is an in-process implementation; a wire broker plugs in
//!   behind the same traits

pub mod local;
pub mod topic;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

pub use local::{ListenAddr, LocalBus};

/// A routed message. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub payload: Vec<u8>,
    pub retain: bool,
}

impl Message {
    /// Create a non-retained message.
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            retain: false,
        }
    }

    /// Mark the message as retained.
    pub fn retained(mut self) -> Self {
        self.retain = true;
        self
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.topic, String::from_utf8_lossy(&self.payload))
    }
}

/// Errors raised by the message transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BusError {
    /// `MQTT.Listen` could not be parsed.
    #[error("invalid listen address {address:?}: {reason}")]
    InvalidListenAddress { address: String, reason: String },

    /// Topic or topic filter is malformed.
    #[error("invalid topic {0:?}")]
    InvalidTopic(String),

    /// The bus has been shut down.
    #[error("message bus is closed")]
    BusClosed,

    /// The client has been closed by its owner.
    #[error("message client is closed")]
    ClientClosed,

    /// The bus did not hand out a client.
    #[error("message bus returned no client")]
    NoClient,
}

/// Callback invoked for every delivered message or transport error.
pub type MessageHandler = Arc<dyn Fn(Result<&Message, &BusError>) + Send + Sync>;

/// A system for passing messages between clients.
pub trait MessageBus: Send + Sync {
    /// Shut the bus down, disconnecting every client.
    fn close(&self) -> Result<(), BusError>;

    /// Connect a new client. `None` when the bus cannot provide one.
    fn new_client(&self) -> Option<Arc<dyn MessageClient>>;
}

/// A connection to a [`MessageBus`].
pub trait MessageClient: Send + Sync {
    /// Register the delivery callback, replacing any previous one.
    fn handle(&self, handler: MessageHandler);

    /// Publish a pre-composed message.
    fn publish_message(&self, message: Message) -> Result<(), BusError>;

    /// Subscribe to a topic filter.
    fn subscribe(&self, topic: &str) -> Result<(), BusError>;

    /// Remove the subscription for a topic filter.
    fn unsubscribe(&self, topic: &str) -> Result<(), BusError>;

    /// Disconnect the client.
    fn close(&self) -> Result<(), BusError>;
}
