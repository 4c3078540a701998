use lazy_static::lazy_static;
use prometheus::{register_counter_vec, register_gauge, register_int_counter, CounterVec, Gauge, IntCounter};
use sqlx::PgPool;
use tracing::{info, warn};

lazy_static! {
    // ── Event counters ──────────────────────────────────────────────────────
    pub static ref CACHE_REQUESTS: CounterVec = register_counter_vec!(
        "api_cache_requests_total",
        "Cache lookups by backend and result",
        &["backend", "result"]
    ).unwrap();

    pub static ref LOGINS_COUNTER: CounterVec = register_counter_vec!(
        "api_logins_total",
        "Login attempts by audience and status",
        &["audience", "status"]
    ).unwrap();

    pub static ref TEMPLATE_APPLIES: IntCounter = register_int_counter!(
        "api_template_applies_total",
        "Templates applied to user plans"
    ).unwrap();

    pub static ref FAN_OUT_ROWS: IntCounter = register_int_counter!(
        "api_fan_out_rows_total",
        "Meal slot rows written by admin plan fan-out"
    ).unwrap();

    // ── Business metrics ────────────────────────────────────────────────────
    pub static ref USERS_GAUGE: Gauge = register_gauge!(
        "mealplan_users_total",
        "Registered users"
    ).unwrap();

    pub static ref TEMPLATES_GAUGE: Gauge = register_gauge!(
        "mealplan_templates_total",
        "Distinct meal plan templates"
    ).unwrap();

    pub static ref PLANNED_MEALS_GAUGE: Gauge = register_gauge!(
        "mealplan_planned_meals_total",
        "Meal slot rows owned by users"
    ).unwrap();
}

/// Spawn the background metrics collector (refreshes every 5 minutes).
pub fn start(pool: PgPool) {
    tokio::spawn(async move {
        loop {
            if let Err(e) = collect(&pool).await {
                warn!("Metrics: collection failed: {}", e);
            }
            tokio::time::sleep(tokio::time::Duration::from_secs(300)).await;
        }
    });
}

async fn collect(pool: &PgPool) -> anyhow::Result<()> {
    let users: i64 = sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM users")
        .fetch_one(pool)
        .await?;
    USERS_GAUGE.set(users as f64);

    let templates: i64 = sqlx::query_scalar(
        "SELECT COUNT(DISTINCT template_key)::BIGINT FROM meal_plans WHERE is_template",
    )
    .fetch_one(pool)
    .await?;
    TEMPLATES_GAUGE.set(templates as f64);

    let planned: i64 =
        sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM meal_plans WHERE NOT is_template")
            .fetch_one(pool)
            .await?;
    PLANNED_MEALS_GAUGE.set(planned as f64);

    info!("Metrics: {users} users, {templates} templates, {planned} planned meals");
    Ok(())
}
