use std::{sync::Arc, time::Duration};

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mealplan_api::{cache::Cache, config::Config, db, routes, services, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env()?);

    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    db::run_migrations(&pool).await?;
    info!("Database connected and migrations applied");

    let cache = Cache::connect(
        config.redis_url.as_deref(),
        Duration::from_secs(config.cache_default_ttl_seconds),
        config.cache_max_entries,
    )
    .await;

    services::metrics::start(pool.clone());

    if config.sync_fan_out {
        info!(week = %config.sync_fan_out_week, "Admin meal plans fan out to every user");
    }

    let state = AppState {
        db: pool,
        cache: Arc::new(cache),
        config: config.clone(),
    };
    let app = routes::router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Meal plan API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
