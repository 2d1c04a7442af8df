use std::sync::Arc;
use std::time::Duration;

use log::info;

use crate::config::Config;
use crate::db::Database;
use crate::error::StoreError;
use crate::service::PollService;

/// Shared by every interaction task. Holds no per-request state.
pub struct AppState {
    pub service: PollService,
    pub store_timeout: Duration,
    pub max_poll_options: usize,
}

impl AppState {
    pub async fn new(config: &Config) -> Result<Arc<Self>, StoreError> {
        let database = Database::new(config).await?;
        info!("Connected to {}", config.database_url);

        Ok(Arc::new(Self::with_service(
            PollService::new(Arc::new(database)),
            config,
        )))
    }

    pub fn with_service(service: PollService, config: &Config) -> Self {
        Self {
            service,
            store_timeout: config.store_timeout,
            max_poll_options: config.max_poll_options,
        }
    }
}
