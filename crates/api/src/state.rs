use std::sync::Arc;

use locker_core::config::EngineConfig;
use locker_core::store::LeaseStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Lease store (PostgreSQL in production, in-memory for tests and demos).
    pub store: Arc<dyn LeaseStore>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn store(&self) -> &dyn LeaseStore {
        self.store.as_ref()
    }

    pub fn engine(&self) -> &EngineConfig {
        &self.config.engine
    }
}
