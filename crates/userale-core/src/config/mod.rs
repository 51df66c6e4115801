pub mod loader;
pub mod params;
pub mod schema;

pub use loader::{ConfigError, ConfigLoader};
pub use schema::{Config, ConfigPatch};

use std::sync::{Arc, RwLock};

/// The single process-wide configuration. Clones share the same instance,
/// and readers always see the latest values.
#[derive(Debug, Clone, Default)]
pub struct SharedConfig {
    inner: Arc<RwLock<Config>>,
}

impl SharedConfig {
    pub fn new(config: Config) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&Config) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        f(&guard)
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut Config) -> R) -> R {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    pub fn snapshot(&self) -> Config {
        self.read(Config::clone)
    }
}
