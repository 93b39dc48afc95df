//! Shared configuration snapshot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::schema::CasaConfig;

/// Process-wide configuration, swapped atomically on reload.
pub struct ConfigStore {
    current: ArcSwap<CasaConfig>,
    generation: AtomicU64,
}

impl ConfigStore {
    pub fn new(config: CasaConfig) -> Self {
        Self {
            current: ArcSwap::from_pointee(config),
            generation: AtomicU64::new(0),
        }
    }

    /// The current snapshot.
    pub fn load(&self) -> Arc<CasaConfig> {
        self.current.load_full()
    }

    /// Install a new snapshot and return its generation.
    pub fn replace(&self, config: CasaConfig) -> u64 {
        self.current.store(Arc::new(config));
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Number of reloads applied so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(CasaConfig::without_services())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_swaps_snapshot() {
        let store = ConfigStore::new(CasaConfig::default());
        let before = store.load();

        let mut next = CasaConfig::default();
        next.cores = 8;
        assert_eq!(store.replace(next), 1);

        assert_eq!(before.cores, 0);
        assert_eq!(store.load().cores, 8);
        assert_eq!(store.generation(), 1);
    }

    #[test]
    fn test_default_store_has_no_services() {
        assert!(ConfigStore::default().load().services.is_empty());
    }
}
