use std::sync::Arc;

use subcast_broker::Registry;
use subcast_config::Settings;

/// State shared by every route handler and session.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub settings: Settings,
}

impl AppState {
    pub fn new(registry: Arc<Registry>, settings: Settings) -> Self {
        Self { registry, settings }
    }
}
