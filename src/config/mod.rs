//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! .casa.toml (explicit path, $HOME, or working directory)
//!     → loader.rs (discover, parse, env overrides, write defaults)
//!     → CasaConfig (schema.rs)
//!     → ConfigStore (store.rs, shared snapshot)
//!     → ConfigView per service per start attempt (view.rs)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → atomic swap in ConfigStore
//!     → future start attempts and direct queries see the new snapshot
//! ```
//!
//! # Design Decisions
//! - Running services keep the view they were started with
//! - All fields have defaults to allow minimal configs
//! - A failed reload keeps the previous snapshot

pub mod loader;
pub mod schema;
pub mod store;
pub mod view;
pub mod watcher;

pub use loader::{load_config, ConfigError, LoadedConfig};
pub use schema::{CasaConfig, MqttConfig, ServiceSection};
pub use store::ConfigStore;
pub use view::ConfigView;
pub use watcher::ConfigWatcher;
