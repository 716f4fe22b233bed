//! Application state shared across request handlers.

use crate::broadcast::Broadcaster;
use crate::handler::ChatHub;
use crate::lifecycle::LifecycleManager;
use crate::registry::ConnectionRegistry;

/// Shared application state. Every component holds a handle to the same
/// registry.
#[derive(Clone)]
pub struct AppState {
    pub registry: ConnectionRegistry,
    pub hub: ChatHub,
    pub lifecycle: LifecycleManager,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_registry(ConnectionRegistry::new())
    }

    pub fn with_registry(registry: ConnectionRegistry) -> Self {
        let broadcaster = Broadcaster::new(registry.clone());
        Self {
            hub: ChatHub::new(registry.clone(), broadcaster.clone()),
            lifecycle: LifecycleManager::new(registry.clone(), broadcaster),
            registry,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
