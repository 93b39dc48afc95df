//! Service registry.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::Service;

/// Concurrency-safe mapping from service name to service.
///
/// Many readers or one writer at a time. Registering an existing name
/// replaces the previous entry.
pub struct ServiceRegistry {
    services: RwLock<HashMap<String, Arc<dyn Service>>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            services: RwLock::new(HashMap::new()),
        }
    }

    pub fn register(&self, name: impl Into<String>, service: Arc<dyn Service>) {
        let name = name.into();
        tracing::debug!(name = %name, "Registering service");
        self.services
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, service);
    }

    /// Remove a service. No-op if absent.
    pub fn remove(&self, name: &str) {
        self.services
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Service>> {
        self.services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Copy of every entry, taken under the read lock.
    pub fn all(&self) -> HashMap<String, Arc<dyn Service>> {
        self.services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
