//! Copying templates into user plans and pushing admin plan changes out.

use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{
        admin_meal_plan::{AdminMealPlan, SyncAction},
        meal_plan::{MealSlotEntry, NewMealEntry},
    },
    services::{
        metrics::{FAN_OUT_ROWS, TEMPLATE_APPLIES},
        templates::{self, TemplateKey, TEMPLATE_WEEK_PREFIX},
    },
};

/// Persistence needed by the sync operations. Implemented for `PgPool` in
/// `db::meal_plans`.
#[allow(async_fn_in_trait)]
pub trait MealPlanStore {
    /// Every row stored under `key`.
    async fn template_entries(&self, key: &TemplateKey) -> Result<Vec<MealSlotEntry>, ApiError>;

    /// Drops all rows of `key` and writes `entries`, atomically.
    async fn replace_template(&self, key: &TemplateKey, entries: &[NewMealEntry]) -> Result<(), ApiError>;

    /// Drops `user_id`'s rows for `week` and writes `entries`, atomically.
    async fn replace_user_week(
        &self,
        user_id: Uuid,
        week: &str,
        entries: &[NewMealEntry],
    ) -> Result<Vec<MealSlotEntry>, ApiError>;

    /// Inserts user rows, overwriting whatever occupies the same slot.
    async fn upsert_user_entries(&self, entries: &[NewMealEntry]) -> Result<u64, ApiError>;

    async fn user_ids(&self) -> Result<Vec<Uuid>, ApiError>;

    async fn record_plan_change(&self, plan_id: Uuid, action: SyncAction, payload: &Value) -> Result<(), ApiError>;
}

/// Rows a user receives when applying `template` to `week`.
pub fn plan_application(template: &[MealSlotEntry], user_id: Uuid, week: &str) -> Vec<NewMealEntry> {
    template
        .iter()
        .filter(|row| row.is_template)
        .map(|row| NewMealEntry {
            user_id: Some(user_id),
            template_key: None,
            week: week.to_string(),
            day: row.day.clone(),
            meal_time: row.meal_time.clone(),
            recipe_id: format!("applied_{}_{}", row.recipe_id, user_id),
            recipe_name: row.recipe_name.clone(),
            servings: row.servings,
            image: row.image.clone(),
            admin_meal_plan_id: row.admin_meal_plan_id,
        })
        .collect()
}

/// Replaces the user's plan for `week` with a copy of the template. Applying
/// the same template twice leaves the same slots behind.
pub async fn apply_template<S: MealPlanStore>(
    store: &S,
    user_id: Uuid,
    key: &TemplateKey,
    week: &str,
) -> Result<Vec<MealSlotEntry>, ApiError> {
    let week = week.trim();
    if week.is_empty() {
        return Err(ApiError::validation("Week is required"));
    }
    if week.starts_with(TEMPLATE_WEEK_PREFIX) {
        return Err(ApiError::validation("Week name is reserved for templates"));
    }

    let template = store.template_entries(key).await?;
    if template.is_empty() {
        return Err(ApiError::not_found("Template not found"));
    }

    let entries = plan_application(&template, user_id, week);
    let rows = store.replace_user_week(user_id, week, &entries).await?;

    TEMPLATE_APPLIES.inc();
    info!(user_id = %user_id, template = %key, week, meals = rows.len(), "Template applied");
    Ok(rows)
}

/// Replaces the rows of `key` on behalf of `owner`: an admin plan id, or
/// `None` for seeded templates. Rows written by a different owner are never
/// touched; the call fails with `Conflict` instead.
pub async fn write_template<S: MealPlanStore>(
    store: &S,
    key: &TemplateKey,
    owner: Option<Uuid>,
    entries: &[NewMealEntry],
) -> Result<(), ApiError> {
    let existing = store.template_entries(key).await?;
    if existing.iter().any(|row| row.admin_meal_plan_id != owner) {
        return Err(ApiError::Conflict(format!("Template {key} belongs to another meal plan")));
    }
    store.replace_template(key, entries).await
}

/// Rows written into every user's plan when an admin plan is published.
pub fn fan_out_entries(plan: &AdminMealPlan, user_ids: &[Uuid], week: &str) -> Vec<NewMealEntry> {
    let slots: Vec<_> = templates::filled_slots(&plan.meals).collect();
    user_ids
        .iter()
        .flat_map(|user_id| {
            slots.iter().map(move |(day, meal_time, slot)| NewMealEntry {
                user_id: Some(*user_id),
                template_key: None,
                week: week.to_string(),
                day: day.to_string(),
                meal_time: meal_time.to_string(),
                recipe_id: format!("admin_{}_{}_{}", plan.id, day, meal_time),
                recipe_name: slot.recipe_name.clone(),
                servings: slot.servings,
                image: slot.image.clone(),
                admin_meal_plan_id: Some(plan.id),
            })
        })
        .collect()
}

pub async fn fan_out<S: MealPlanStore>(store: &S, plan: &AdminMealPlan, week: &str) -> Result<u64, ApiError> {
    let users = store.user_ids().await?;
    let entries = fan_out_entries(plan, &users, week);
    if entries.is_empty() {
        return Ok(0);
    }
    let written = store.upsert_user_entries(&entries).await?;
    FAN_OUT_ROWS.inc_by(written);
    info!(plan_id = %plan.id, users = users.len(), rows = written, week, "Meal plan fanned out");
    Ok(written)
}

/// Outcome of [`publish`]; each step is best effort.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub template_rows: usize,
    pub notified: bool,
    pub fanned_out: u64,
}

/// Mirrors an admin plan change into template rows, the change feed and,
/// when `fan_out_week` is set, every user's plan for that week.
///
/// Failures are logged and never surface to the caller: the admin write has
/// already committed by the time this runs.
pub async fn publish<S: MealPlanStore>(
    store: &S,
    plan: &AdminMealPlan,
    action: SyncAction,
    fan_out_week: Option<&str>,
) -> PublishReport {
    let mut report = PublishReport::default();
    let live = action != SyncAction::Delete && plan.is_active();

    match TemplateKey::parse(&plan.template_key) {
        Ok(key) => {
            let entries = if live {
                templates::encode(&key, &plan.meals, Some(plan.id))
            } else {
                Vec::new()
            };
            match write_template(store, &key, Some(plan.id), &entries).await {
                Ok(()) => report.template_rows = entries.len(),
                Err(ApiError::Conflict(e)) => warn!(plan_id = %plan.id, "Leaving template rows alone: {e}"),
                Err(e) => error!(plan_id = %plan.id, "Failed to refresh template rows: {e}"),
            }
        }
        Err(e) => warn!(plan_id = %plan.id, key = %plan.template_key, "Skipping template refresh: {e}"),
    }

    match serde_json::to_value(plan) {
        Ok(payload) => match store.record_plan_change(plan.id, action, &payload).await {
            Ok(()) => report.notified = true,
            Err(e) => error!(plan_id = %plan.id, "Failed to record meal plan change: {e}"),
        },
        Err(e) => error!(plan_id = %plan.id, "Failed to serialize meal plan: {e}"),
    }

    if let (true, Some(week)) = (live, fan_out_week) {
        match fan_out(store, plan, week).await {
            Ok(n) => report.fanned_out = n,
            Err(e) => error!(plan_id = %plan.id, "Fan-out failed: {e}"),
        }
    }

    report
}
