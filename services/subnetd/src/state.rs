use std::sync::Arc;

use crate::config::AppConfig;
use crate::registry::TaskRegistry;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub tasks: TaskRegistry,
    pub cfg: AppConfig,
}

impl AppState {
    pub fn new(cfg: AppConfig) -> Self {
        Self {
            tasks: TaskRegistry::new(),
            cfg,
        }
    }
}
