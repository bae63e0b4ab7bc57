// Application state module
// Shared, read-only state handed to every connection

use std::sync::Arc;

use super::types::Config;
use crate::model::Predictor;

/// Application state
pub struct AppState {
    pub config: Config,
    /// Loaded once at startup, never replaced
    pub model: Arc<dyn Predictor>,
    access_log: bool,
}

impl AppState {
    pub fn new(config: &Config, model: Arc<dyn Predictor>) -> Self {
        Self {
            config: config.clone(),
            model,
            access_log: config.logging.access_log,
        }
    }

    pub const fn access_log_enabled(&self) -> bool {
        self.access_log
    }
}
