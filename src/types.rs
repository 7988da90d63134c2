use std::{sync::Arc, time::Instant};

use crate::{
    config::{Config, RateLimitConfig},
    errors::AppError,
    rate_limit::RateLimiter,
    services::ShortLinkService,
    store::{self, RecordStore},
};

/// State shared by every request, in both hosting modes
pub struct AppState {
    pub start_time: Instant,
    pub version: String,
    pub service: ShortLinkService,
    pub limiter: RateLimiter,
}

impl AppState {
    pub fn new(config: &Config, store: Arc<dyn RecordStore>) -> Self {
        let mut state = Self::from_parts(store, &config.rate_limit, config.short_code_length);
        state.version = config.app.version.clone();
        state
    }

    pub fn from_parts(
        store: Arc<dyn RecordStore>,
        rate_limit: &RateLimitConfig,
        short_code_length: usize,
    ) -> Self {
        Self {
            start_time: Instant::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            service: ShortLinkService::new(store, short_code_length),
            limiter: RateLimiter::new(rate_limit),
        }
    }

    /// Builds the store named by `config` and wires everything around it
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let store = store::from_config(&config.store)?;
        Ok(Self::new(config, store))
    }

    /// Seconds since the state was built
    pub fn uptime(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
