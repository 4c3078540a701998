use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    cache::Cache,
    error::ApiError,
    models::content::{SubscriptionPlan, UpsertSubscriptionPlanRequest},
    services::auth::sanitize,
};

pub const PLANS_CACHE_KEY: &str = "plans";
const INTERVALS: [&str; 2] = ["month", "year"];

/// Checked plan input; `None` leaves a column unchanged on update.
#[derive(Debug, PartialEq)]
struct PlanInput {
    name: Option<String>,
    price_cents: Option<i32>,
    interval: Option<String>,
    features: Option<Vec<String>>,
    is_active: Option<bool>,
}

fn plan_input(req: UpsertSubscriptionPlanRequest, require_name: bool) -> Result<PlanInput, ApiError> {
    let name = req.name.as_deref().map(sanitize);
    match name.as_deref() {
        Some("") => return Err(ApiError::validation("Plan name cannot be empty")),
        None if require_name => return Err(ApiError::validation("Plan name is required")),
        _ => {}
    }
    if req.price_cents.is_some_and(|p| p < 0) {
        return Err(ApiError::validation("Price cannot be negative"));
    }
    let interval = req.interval.as_deref().map(|i| sanitize(i).to_lowercase());
    if interval.as_deref().is_some_and(|i| !INTERVALS.contains(&i)) {
        return Err(ApiError::validation("Interval must be month or year"));
    }
    Ok(PlanInput {
        name,
        price_cents: req.price_cents,
        interval,
        features: req
            .features
            .map(|f| f.iter().map(|s| sanitize(s)).filter(|s| !s.is_empty()).collect()),
        is_active: req.is_active,
    })
}

pub struct SubscriptionService;

impl SubscriptionService {
    /// Active plans, cheapest first. Cached under `plans`.
    pub async fn active(pool: &PgPool, cache: &Cache) -> Result<Vec<SubscriptionPlan>, ApiError> {
        cache
            .get_or_fetch(PLANS_CACHE_KEY, None, || async {
                let plans = sqlx::query_as::<_, SubscriptionPlan>(
                    "SELECT * FROM subscription_plans WHERE is_active ORDER BY price_cents, name",
                )
                .fetch_all(pool)
                .await?;
                Ok::<_, ApiError>(plans)
            })
            .await
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<SubscriptionPlan>, ApiError> {
        let plans = sqlx::query_as::<_, SubscriptionPlan>("SELECT * FROM subscription_plans ORDER BY price_cents, name")
            .fetch_all(pool)
            .await?;
        Ok(plans)
    }

    pub async fn create(
        pool: &PgPool,
        cache: &Cache,
        req: UpsertSubscriptionPlanRequest,
    ) -> Result<SubscriptionPlan, ApiError> {
        let input = plan_input(req, true)?;
        let plan = sqlx::query_as::<_, SubscriptionPlan>(
            r#"INSERT INTO subscription_plans (name, price_cents, billing_interval, features, is_active)
               VALUES ($1, COALESCE($2, 0), COALESCE($3, 'month'), COALESCE($4, '{}'), COALESCE($5, TRUE))
               RETURNING *"#,
        )
        .bind(&input.name)
        .bind(input.price_cents)
        .bind(&input.interval)
        .bind(&input.features)
        .bind(input.is_active)
        .fetch_one(pool)
        .await?;
        cache.delete(PLANS_CACHE_KEY).await;
        Ok(plan)
    }

    pub async fn update(
        pool: &PgPool,
        cache: &Cache,
        id: Uuid,
        req: UpsertSubscriptionPlanRequest,
    ) -> Result<SubscriptionPlan, ApiError> {
        let input = plan_input(req, false)?;
        let plan = sqlx::query_as::<_, SubscriptionPlan>(
            r#"UPDATE subscription_plans SET
                 name = COALESCE($2, name),
                 price_cents = COALESCE($3, price_cents),
                 billing_interval = COALESCE($4, billing_interval),
                 features = COALESCE($5, features),
                 is_active = COALESCE($6, is_active),
                 updated_at = NOW()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(input.price_cents)
        .bind(&input.interval)
        .bind(&input.features)
        .bind(input.is_active)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Plan not found"))?;
        cache.delete(PLANS_CACHE_KEY).await;
        Ok(plan)
    }

    pub async fn delete(pool: &PgPool, cache: &Cache, id: Uuid) -> Result<(), ApiError> {
        let res = sqlx::query("DELETE FROM subscription_plans WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(ApiError::not_found("Plan not found"));
        }
        cache.delete(PLANS_CACHE_KEY).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(name: Option<&str>, interval: Option<&str>, price: Option<i32>) -> UpsertSubscriptionPlanRequest {
        UpsertSubscriptionPlanRequest {
            name: name.map(String::from),
            price_cents: price,
            interval: interval.map(String::from),
            features: Some(vec!["Unlimited plans".into(), " ".into()]),
            is_active: None,
        }
    }

    #[test]
    fn create_requires_a_name() {
        assert!(plan_input(req(None, None, None), true).is_err());
        assert!(plan_input(req(None, None, None), false).is_ok());
        assert!(plan_input(req(Some(" "), None, None), false).is_err());
    }

    #[test]
    fn interval_and_price_are_checked() {
        assert!(plan_input(req(Some("Pro"), Some("week"), None), true).is_err());
        assert!(plan_input(req(Some("Pro"), None, Some(-1)), true).is_err());
        let input = plan_input(req(Some("Pro"), Some("Year"), Some(999)), true).unwrap();
        assert_eq!(input.interval.as_deref(), Some("year"));
        assert_eq!(input.features, Some(vec!["Unlimited plans".to_string()]));
    }
}
