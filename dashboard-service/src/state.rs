//! Application state for the dashboard service.

use std::sync::Arc;

use common::config::AppConfig;

use crate::connection_resolver::ConnectionResolver;
use crate::service::{TableService, TableServiceTrait};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub service: Arc<dyn TableServiceTrait>,
}

impl AppState {
    /// Creates a new application state.
    ///
    /// No connection is opened here; each request opens its own.
    pub fn new(config: AppConfig) -> Self {
        let config = Arc::new(config);
        let resolver = Arc::new(ConnectionResolver::new(&config));
        Self {
            service: Arc::new(TableService::new(config.clone(), resolver)),
            config,
        }
    }
}
