use std::sync::Arc;

use crate::config::Config;
use crate::storage::Storage;

/// Central application state shared across all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Storage client, built once at startup.
    pub storage: Arc<dyn Storage>,

    /// Application configuration loaded from environment variables or `.env`.
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>, config: Config) -> Self {
        Self {
            storage,
            config: Arc::new(config),
        }
    }
}
