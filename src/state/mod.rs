use std::sync::Arc;
use std::time::Instant;

use crate::config::ApiConfig;
use crate::pipeline::PerkChecker;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub checker: PerkChecker,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: Arc<ApiConfig>, checker: PerkChecker) -> Self {
        assert!(
            config.frame.base_path.starts_with('/'),
            "Frame base path must be absolute"
        );
        Self {
            config,
            checker,
            start_time: Instant::now(),
        }
    }
}
