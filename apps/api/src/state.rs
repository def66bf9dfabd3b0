use std::sync::Arc;

use crate::config::Config;
use crate::layout::LayoutPolicy;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Layout policy resolved at startup; copied into each blocking validation task.
    pub policy: LayoutPolicy,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            policy: config.policy,
            config: Arc::new(config),
        }
    }
}
