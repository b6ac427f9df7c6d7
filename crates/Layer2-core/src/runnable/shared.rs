//! Shared registry - atomically swappable snapshot

use super::discovery::RunnableLoader;
use super::registry::RunnableRegistry;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

/// The registry that dispatch reads from.
///
/// Readers take an `Arc` snapshot and keep using it even if a reload
/// publishes a new registry in the meantime.
pub struct SharedRegistry {
    current: RwLock<Arc<RunnableRegistry>>,
}

impl Default for SharedRegistry {
    fn default() -> Self {
        Self::new(RunnableRegistry::new())
    }
}

impl SharedRegistry {
    pub fn new(registry: RunnableRegistry) -> Self {
        Self {
            current: RwLock::new(Arc::new(registry)),
        }
    }

    pub fn snapshot(&self) -> Arc<RunnableRegistry> {
        Arc::clone(&self.current.read())
    }

    /// Replace the current registry
    pub fn publish(&self, registry: RunnableRegistry) {
        *self.current.write() = Arc::new(registry);
    }

    /// Re-run discovery and publish the result. Returns the registration count.
    pub async fn reload(&self, loader: &RunnableLoader) -> usize {
        let fresh = loader.load().await;
        let count = fresh.len();
        self.publish(fresh);
        info!("Runnables reloaded: {} registration(s)", count);
        count
    }
}
