//! Keyed factory for shared managers.
//!
//! Replaces a process-global singleton: callers own a registry and get back
//! the same [`Manager`] for the same application id and configuration.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::ManagerConfig;
use crate::manager::Manager;
use crate::transport::Transport;

type Key = (String, ManagerConfig);

/// Hands out at most one [`Manager`] per `(app id, config)` pair.
#[derive(Debug, Default)]
pub struct ManagerRegistry {
    managers: RwLock<HashMap<Key, Arc<Manager>>>,
}

impl ManagerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an existing manager. Takes only the shared read lock.
    pub fn get(&self, app_id: &str, config: &ManagerConfig) -> Option<Arc<Manager>> {
        let key = (app_id.to_string(), config.clone());
        self.managers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }

    /// Return the manager for this pair, creating it on first use.
    ///
    /// `make_transport` runs at most once per pair, under the write lock.
    pub fn get_or_create<F>(
        &self,
        app_id: &str,
        config: &ManagerConfig,
        make_transport: F,
    ) -> Arc<Manager>
    where
        F: FnOnce(&ManagerConfig) -> Arc<dyn Transport>,
    {
        if let Some(existing) = self.get(app_id, config) {
            return existing;
        }

        let mut managers = self
            .managers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let key = (app_id.to_string(), config.clone());
        Arc::clone(managers.entry(key).or_insert_with(|| {
            tracing::debug!("Creating manager for {app_id}");
            Arc::new(Manager::new(app_id, config.clone(), make_transport(config)))
        }))
    }

    /// Number of managers created so far.
    pub fn len(&self) -> usize {
        self.managers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no manager has been created yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
