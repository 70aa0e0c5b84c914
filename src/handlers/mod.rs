//! HTTP request handlers for promdemo

use crate::config::Config;
use crate::metrics::Metrics;
use std::sync::Arc;

pub mod greeting;
pub mod metrics;
pub mod session;

/// Application state shared across all handlers
///
/// Config is Arc'd and `Metrics` clones share the same instruments, so cloning
/// the state per request is cheap.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    metrics: Metrics,
}

impl AppState {
    /// Create a new AppState from configuration and the metrics registry
    pub fn new(config: Arc<Config>, metrics: Metrics) -> Self {
        Self { config, metrics }
    }

    /// Get reference to the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get reference to the metrics registry
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}
