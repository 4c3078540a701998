use chrono::NaiveDate;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::{
    cache::Cache,
    error::ApiError,
    models::{
        admin_meal_plan::{
            AdminMealPlan, CreateAdminMealPlanRequest, SyncAction, UpdateAdminMealPlanRequest, PLAN_STATUSES,
        },
        meal_plan::WeekMeals,
    },
    services::{
        auth::sanitize,
        sync::{self, MealPlanStore},
        templates::{parse_meals, TemplateKey, TEMPLATES_CACHE_KEY},
    },
};

fn plan_status(status: Option<&str>) -> Result<Option<String>, ApiError> {
    match status.map(str::trim) {
        Some(s) if PLAN_STATUSES.contains(&s) => Ok(Some(s.to_string())),
        Some(_) => Err(ApiError::validation("Status must be active, draft or archived")),
        None => Ok(None),
    }
}

fn plan_meals(meals: Option<serde_json::Value>) -> Result<Option<WeekMeals>, ApiError> {
    meals.map(parse_meals).transpose()
}

/// Where admin plan changes are pushed after they commit.
#[derive(Debug, Clone, Default)]
pub struct PublishTarget {
    /// Plan identifier written into every user's plan; `None` disables fan-out.
    pub fan_out_week: Option<String>,
}

pub struct AdminMealPlanService;

impl AdminMealPlanService {
    pub async fn list(pool: &PgPool) -> Result<Vec<AdminMealPlan>, ApiError> {
        let plans = sqlx::query_as::<_, AdminMealPlan>("SELECT * FROM admin_meal_plans ORDER BY created_at DESC")
            .fetch_all(pool)
            .await?;
        Ok(plans)
    }

    pub async fn create(
        pool: &PgPool,
        cache: &Cache,
        target: &PublishTarget,
        admin_id: Uuid,
        req: CreateAdminMealPlanRequest,
    ) -> Result<AdminMealPlan, ApiError> {
        let name = sanitize(req.name.as_deref().unwrap_or_default());
        if name.is_empty() {
            return Err(ApiError::validation("Meal plan name is required"));
        }
        let key = TemplateKey::from_plan_name(&name)?;
        if !pool.template_entries(&key).await?.is_empty() {
            return Err(ApiError::Conflict(format!("Template {key} already exists")));
        }
        let status = plan_status(req.status.as_deref())?;
        let meals = plan_meals(req.meals)?.unwrap_or_default();

        let plan = sqlx::query_as::<_, AdminMealPlan>(
            r#"INSERT INTO admin_meal_plans (name, description, week_start, meals, status, template_key, created_by)
               VALUES ($1, $2, $3, $4, COALESCE($5, 'active'), $6, $7)
               RETURNING *"#,
        )
        .bind(&name)
        .bind(req.description.as_deref().map(sanitize).unwrap_or_default())
        .bind(req.week_start)
        .bind(Json(&meals))
        .bind(&status)
        .bind(key.as_str())
        .bind(admin_id)
        .fetch_one(pool)
        .await
        .map_err(|e| match ApiError::from(e) {
            ApiError::Conflict(_) => ApiError::Conflict("A meal plan with this name already exists".into()),
            other => other,
        })?;

        tracing::info!(plan_id = %plan.id, key = %plan.template_key, "Admin meal plan created");
        Self::publish(pool, cache, target, &plan, SyncAction::Create).await;
        Ok(plan)
    }

    /// The template key is fixed at creation; renaming keeps it.
    pub async fn update(
        pool: &PgPool,
        cache: &Cache,
        target: &PublishTarget,
        id: Uuid,
        req: UpdateAdminMealPlanRequest,
    ) -> Result<AdminMealPlan, ApiError> {
        let name = req.name.as_deref().map(sanitize);
        if name.as_deref() == Some("") {
            return Err(ApiError::validation("Meal plan name cannot be empty"));
        }
        let status = plan_status(req.status.as_deref())?;
        let meals = plan_meals(req.meals)?;
        let week_start: Option<NaiveDate> = req.week_start;

        let plan = sqlx::query_as::<_, AdminMealPlan>(
            r#"UPDATE admin_meal_plans SET
                 name = COALESCE($2, name),
                 description = COALESCE($3, description),
                 week_start = COALESCE($4, week_start),
                 meals = COALESCE($5, meals),
                 status = COALESCE($6, status),
                 updated_at = NOW()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(&name)
        .bind(req.description.as_deref().map(sanitize))
        .bind(week_start)
        .bind(meals.as_ref().map(Json))
        .bind(&status)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Meal plan not found"))?;

        Self::publish(pool, cache, target, &plan, SyncAction::Update).await;
        Ok(plan)
    }

    pub async fn delete(pool: &PgPool, cache: &Cache, target: &PublishTarget, id: Uuid) -> Result<(), ApiError> {
        let plan = sqlx::query_as::<_, AdminMealPlan>("DELETE FROM admin_meal_plans WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Meal plan not found"))?;

        tracing::info!(plan_id = %plan.id, "Admin meal plan deleted");
        Self::publish(pool, cache, target, &plan, SyncAction::Delete).await;
        Ok(())
    }

    pub async fn mark_processed(pool: &PgPool, notification_id: Uuid) -> Result<(), ApiError> {
        let res = sqlx::query(
            "UPDATE meal_plan_notifications SET status = 'processed', processed_at = NOW() WHERE id = $1",
        )
        .bind(notification_id)
        .execute(pool)
        .await?;
        if res.rows_affected() == 0 {
            return Err(ApiError::not_found("Notification not found"));
        }
        Ok(())
    }

    async fn publish(pool: &PgPool, cache: &Cache, target: &PublishTarget, plan: &AdminMealPlan, action: SyncAction) {
        let report = sync::publish(pool, plan, action, target.fan_out_week.as_deref()).await;
        cache.delete(TEMPLATES_CACHE_KEY).await;
        tracing::debug!(plan_id = %plan.id, action = action.as_str(), ?report, "Meal plan published");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_is_checked() {
        assert_eq!(plan_status(Some(" draft ")).unwrap().as_deref(), Some("draft"));
        assert!(plan_status(Some("deleted")).is_err());
        assert_eq!(plan_status(None).unwrap(), None);
    }

    #[test]
    fn meals_are_optional_but_must_be_nested() {
        assert_eq!(plan_meals(None).unwrap(), None);
        let meals = plan_meals(Some(json!({ "Monday": { "Dinner": { "recipe_name": "Salmon" } } })))
            .unwrap()
            .unwrap();
        assert_eq!(meals["Monday"]["Dinner"].recipe_name, "Salmon");
        assert!(plan_meals(Some(json!("Monday"))).is_err());
    }
}
