use serde_json::Value;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{
        admin_meal_plan::SyncAction,
        meal_plan::{MealSlotEntry, NewMealEntry},
    },
    services::{sync::MealPlanStore, templates::TemplateKey},
};

const INSERT_ENTRY: &str = r#"
    INSERT INTO meal_plans
        (user_id, is_template, template_key, week, day, meal_time,
         recipe_id, recipe_name, servings, image, admin_meal_plan_id)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
    RETURNING *
"#;

const UPSERT_USER_ENTRY: &str = r#"
    INSERT INTO meal_plans
        (user_id, is_template, template_key, week, day, meal_time,
         recipe_id, recipe_name, servings, image, admin_meal_plan_id)
    VALUES ($1, FALSE, NULL, $2, $3, $4, $5, $6, $7, $8, $9)
    ON CONFLICT (user_id, week, day, meal_time) WHERE NOT is_template
    DO UPDATE SET recipe_id = EXCLUDED.recipe_id,
                  recipe_name = EXCLUDED.recipe_name,
                  servings = EXCLUDED.servings,
                  image = EXCLUDED.image,
                  admin_meal_plan_id = EXCLUDED.admin_meal_plan_id,
                  updated_at = NOW()
    RETURNING *
"#;

/// Plain insert; fails on an occupied slot.
pub async fn insert_entry<'e, E: PgExecutor<'e>>(ex: E, e: &NewMealEntry) -> Result<MealSlotEntry, sqlx::Error> {
    sqlx::query_as::<_, MealSlotEntry>(INSERT_ENTRY)
        .bind(e.user_id)
        .bind(e.is_template())
        .bind(&e.template_key)
        .bind(&e.week)
        .bind(&e.day)
        .bind(&e.meal_time)
        .bind(&e.recipe_id)
        .bind(&e.recipe_name)
        .bind(e.servings)
        .bind(&e.image)
        .bind(e.admin_meal_plan_id)
        .fetch_one(ex)
        .await
}

/// Insert-or-replace on the user's (week, day, meal time) slot.
pub async fn upsert_user_entry<'e, E: PgExecutor<'e>>(ex: E, e: &NewMealEntry) -> Result<MealSlotEntry, sqlx::Error> {
    sqlx::query_as::<_, MealSlotEntry>(UPSERT_USER_ENTRY)
        .bind(e.user_id)
        .bind(&e.week)
        .bind(&e.day)
        .bind(&e.meal_time)
        .bind(&e.recipe_id)
        .bind(&e.recipe_name)
        .bind(e.servings)
        .bind(&e.image)
        .bind(e.admin_meal_plan_id)
        .fetch_one(ex)
        .await
}

/// Whether an admin meal plan was created under `key`, published or not.
pub async fn plan_claims_key(pool: &PgPool, key: &TemplateKey) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM admin_meal_plans WHERE template_key = $1)")
        .bind(key.as_str())
        .fetch_one(pool)
        .await
}

impl MealPlanStore for PgPool {
    async fn template_entries(&self, key: &TemplateKey) -> Result<Vec<MealSlotEntry>, ApiError> {
        let rows = sqlx::query_as::<_, MealSlotEntry>(
            "SELECT * FROM meal_plans WHERE is_template AND template_key = $1 ORDER BY day, meal_time",
        )
        .bind(key.as_str())
        .fetch_all(self)
        .await?;
        Ok(rows)
    }

    async fn replace_template(&self, key: &TemplateKey, entries: &[NewMealEntry]) -> Result<(), ApiError> {
        let mut tx = self.begin().await?;
        sqlx::query("DELETE FROM meal_plans WHERE is_template AND template_key = $1")
            .bind(key.as_str())
            .execute(&mut *tx)
            .await?;
        for entry in entries {
            insert_entry(&mut *tx, entry).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn replace_user_week(
        &self,
        user_id: Uuid,
        week: &str,
        entries: &[NewMealEntry],
    ) -> Result<Vec<MealSlotEntry>, ApiError> {
        let mut tx = self.begin().await?;
        sqlx::query("DELETE FROM meal_plans WHERE user_id = $1 AND week = $2 AND NOT is_template")
            .bind(user_id)
            .bind(week)
            .execute(&mut *tx)
            .await?;
        let mut rows = Vec::with_capacity(entries.len());
        for entry in entries {
            rows.push(insert_entry(&mut *tx, entry).await?);
        }
        tx.commit().await?;
        Ok(rows)
    }

    async fn upsert_user_entries(&self, entries: &[NewMealEntry]) -> Result<u64, ApiError> {
        let mut tx = self.begin().await?;
        for entry in entries {
            upsert_user_entry(&mut *tx, entry).await?;
        }
        tx.commit().await?;
        Ok(entries.len() as u64)
    }

    async fn user_ids(&self) -> Result<Vec<Uuid>, ApiError> {
        let ids = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users ORDER BY created_at")
            .fetch_all(self)
            .await?;
        Ok(ids)
    }

    async fn record_plan_change(&self, plan_id: Uuid, action: SyncAction, payload: &Value) -> Result<(), ApiError> {
        sqlx::query(
            "INSERT INTO meal_plan_notifications (action, meal_plan_id, meal_plan_data) VALUES ($1, $2, $3)",
        )
        .bind(action.as_str())
        .bind(plan_id)
        .bind(sqlx::types::Json(payload))
        .execute(self)
        .await?;
        Ok(())
    }
}
