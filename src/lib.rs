pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use sqlx::PgPool;

use cache::Cache;
use config::Config;
use services::admin_meal_plans::PublishTarget;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub cache: Arc<Cache>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn publish_target(&self) -> PublishTarget {
        PublishTarget {
            fan_out_week: self
                .config
                .sync_fan_out
                .then(|| self.config.sync_fan_out_week.clone()),
        }
    }
}
