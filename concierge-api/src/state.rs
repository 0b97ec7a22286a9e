use std::sync::Arc;

use concierge_offer::SearchOrchestrator;
use concierge_store::app_config::{Config, RateLimitConfig};
use concierge_store::Backends;

#[derive(Clone)]
pub struct AppState {
    pub search: Arc<SearchOrchestrator>,
    pub backends: Backends,
    pub rate_limit: RateLimitConfig,
}

impl AppState {
    pub fn new(config: &Config, backends: Backends) -> Self {
        Self {
            search: Arc::new(SearchOrchestrator::from_config(config, &backends)),
            backends,
            rate_limit: config.rate_limit.clone(),
        }
    }
}
