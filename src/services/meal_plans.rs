use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    cache::Cache,
    db::meal_plans::upsert_user_entry,
    error::ApiError,
    models::{
        admin_meal_plan::MealPlanNotification,
        meal_plan::{MealSlotEntry, NewMealEntry, TemplateView, UpsertMealRequest, WeekMeals, DEFAULT_IMAGE},
    },
    services::{
        auth::sanitize,
        sync,
        templates::{self, TemplateKey, TEMPLATES_CACHE_KEY, TEMPLATE_WEEK_PREFIX},
    },
};

const SYNC_FEED_LIMIT: i64 = 50;

/// Validates a slot edit into the row it will write.
pub fn slot_entry(user_id: Uuid, req: UpsertMealRequest) -> Result<NewMealEntry, ApiError> {
    let week = sanitize(&req.week);
    let day = sanitize(&req.day);
    let meal_time = sanitize(&req.meal_time);
    let recipe_name = sanitize(&req.recipe_name);

    if week.is_empty() || day.is_empty() || meal_time.is_empty() || recipe_name.is_empty() {
        return Err(ApiError::validation("Week, day, meal_time and recipe_name are required"));
    }
    if week.starts_with(TEMPLATE_WEEK_PREFIX) {
        return Err(ApiError::validation("Week name is reserved for templates"));
    }
    let servings = req.servings.unwrap_or(1);
    if servings < 1 {
        return Err(ApiError::validation("Servings must be at least 1"));
    }

    let recipe_id = req
        .recipe_id
        .as_deref()
        .map(sanitize)
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| format!("custom_{day}_{meal_time}_{user_id}"));

    Ok(NewMealEntry {
        user_id: Some(user_id),
        template_key: None,
        week,
        day,
        meal_time,
        recipe_id,
        recipe_name,
        servings,
        image: req
            .image
            .as_deref()
            .map(sanitize)
            .filter(|i| !i.is_empty())
            .unwrap_or_else(|| DEFAULT_IMAGE.to_string()),
        admin_meal_plan_id: None,
    })
}

pub struct MealPlanService;

impl MealPlanService {
    pub async fn week(pool: &PgPool, user_id: Uuid, week: &str) -> Result<WeekMeals, ApiError> {
        let rows = sqlx::query_as::<_, MealSlotEntry>(
            "SELECT * FROM meal_plans WHERE user_id = $1 AND week = $2 AND NOT is_template",
        )
        .bind(user_id)
        .bind(week.trim())
        .fetch_all(pool)
        .await?;
        Ok(templates::nest_user_plan(&rows))
    }

    pub async fn weeks(pool: &PgPool, user_id: Uuid) -> Result<Vec<String>, ApiError> {
        let weeks = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT week FROM meal_plans WHERE user_id = $1 AND NOT is_template ORDER BY week",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(weeks)
    }

    pub async fn upsert_slot(pool: &PgPool, user_id: Uuid, req: UpsertMealRequest) -> Result<MealSlotEntry, ApiError> {
        let entry = slot_entry(user_id, req)?;
        Ok(upsert_user_entry(pool, &entry).await?)
    }

    pub async fn delete_slot(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<(), ApiError> {
        let res = sqlx::query("DELETE FROM meal_plans WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(ApiError::not_found("Meal not found"));
        }
        Ok(())
    }

    pub async fn clear_week(pool: &PgPool, user_id: Uuid, week: &str) -> Result<u64, ApiError> {
        let res = sqlx::query("DELETE FROM meal_plans WHERE user_id = $1 AND week = $2 AND NOT is_template")
            .bind(user_id)
            .bind(week.trim())
            .execute(pool)
            .await?;
        Ok(res.rows_affected())
    }

    /// All templates, decoded and named. Cached under `templates:all`.
    pub async fn templates(pool: &PgPool, cache: &Cache) -> Result<Vec<TemplateView>, ApiError> {
        cache
            .get_or_fetch(TEMPLATES_CACHE_KEY, None, || Self::load_templates(pool))
            .await
    }

    async fn load_templates(pool: &PgPool) -> Result<Vec<TemplateView>, ApiError> {
        let rows = sqlx::query_as::<_, MealSlotEntry>(
            "SELECT * FROM meal_plans WHERE is_template ORDER BY template_key, day, meal_time",
        )
        .fetch_all(pool)
        .await?;
        let details: HashMap<String, (String, String)> = sqlx::query_as::<_, (String, String, String)>(
            "SELECT template_key, name, description FROM admin_meal_plans",
        )
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|(key, name, description)| (key, (name, description)))
        .collect();

        Ok(templates::template_views(templates::decode(&rows), &details))
    }

    pub async fn apply_template(
        pool: &PgPool,
        user_id: Uuid,
        template_id: &str,
        week: &str,
    ) -> Result<(String, WeekMeals), ApiError> {
        let key = TemplateKey::parse(template_id)?;
        let week = week.trim().to_string();
        let rows = sync::apply_template(pool, user_id, &key, &week).await?;
        Ok((week, templates::nest_user_plan(&rows)))
    }

    /// Meal plan changes since `since`, or the latest ones.
    pub async fn changes(pool: &PgPool, since: Option<DateTime<Utc>>) -> Result<Vec<MealPlanNotification>, ApiError> {
        let rows = match since {
            Some(since) => {
                sqlx::query_as::<_, MealPlanNotification>(
                    "SELECT * FROM meal_plan_notifications WHERE created_at > $1 ORDER BY created_at ASC LIMIT $2",
                )
                .bind(since)
                .bind(SYNC_FEED_LIMIT)
                .fetch_all(pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, MealPlanNotification>(
                    "SELECT * FROM meal_plan_notifications ORDER BY created_at DESC LIMIT $1",
                )
                .bind(SYNC_FEED_LIMIT)
                .fetch_all(pool)
                .await?
            }
        };
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(week: &str, recipe_name: &str) -> UpsertMealRequest {
        UpsertMealRequest {
            week: week.into(),
            day: "Monday".into(),
            meal_time: "Lunch".into(),
            recipe_name: recipe_name.into(),
            recipe_id: None,
            servings: None,
            image: None,
        }
    }

    #[test]
    fn slot_entry_fills_defaults() {
        let user = Uuid::new_v4();
        let entry = slot_entry(user, req(" Week - 1 ", "Soup")).unwrap();
        assert_eq!(entry.week, "Week - 1");
        assert_eq!(entry.servings, 1);
        assert_eq!(entry.image, DEFAULT_IMAGE);
        assert_eq!(entry.recipe_id, format!("custom_Monday_Lunch_{user}"));
        assert!(!entry.is_template());
    }

    #[test]
    fn slot_entry_rejects_bad_input() {
        let user = Uuid::new_v4();
        assert!(slot_entry(user, req("Week - 1", "  ")).is_err());
        assert!(slot_entry(user, req("template_keto", "Soup")).is_err());

        let mut zero = req("Week - 1", "Soup");
        zero.servings = Some(0);
        assert!(slot_entry(user, zero).is_err());
    }
}
