use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const DEFAULT_IMAGE: &str = "🍽️";
pub const DEFAULT_WEEK: &str = "Week - 1";

/// One `meal_plans` row: a recipe assigned to a day and meal time.
/// Template rows have no owner and carry a `template_key`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct MealSlotEntry {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub is_template: bool,
    pub template_key: Option<String>,
    pub week: String,
    pub day: String,
    pub meal_time: String,
    pub recipe_id: String,
    pub recipe_name: String,
    pub servings: i32,
    pub image: String,
    pub admin_meal_plan_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row about to be written; id and timestamps are assigned by the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMealEntry {
    pub user_id: Option<Uuid>,
    pub template_key: Option<String>,
    pub week: String,
    pub day: String,
    pub meal_time: String,
    pub recipe_id: String,
    pub recipe_name: String,
    pub servings: i32,
    pub image: String,
    pub admin_meal_plan_id: Option<Uuid>,
}

impl NewMealEntry {
    pub fn is_template(&self) -> bool {
        self.template_key.is_some()
    }
}

/// Client-facing content of a single slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MealSlot {
    #[serde(default)]
    pub recipe_name: String,
    #[serde(default = "default_servings")]
    pub servings: i32,
    #[serde(default = "default_image")]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
}

impl MealSlot {
    pub fn new(recipe_name: impl Into<String>) -> Self {
        Self {
            recipe_name: recipe_name.into(),
            servings: default_servings(),
            image: default_image(),
            recipe_id: None,
            id: None,
        }
    }
}

fn default_servings() -> i32 {
    1
}

fn default_image() -> String {
    DEFAULT_IMAGE.to_string()
}

/// day → meal time → slot
pub type WeekMeals = BTreeMap<String, BTreeMap<String, MealSlot>>;

/// Body for PUT /api/meal-plan.
#[derive(Debug, Deserialize)]
pub struct UpsertMealRequest {
    pub week: String,
    pub day: String,
    pub meal_time: String,
    pub recipe_name: String,
    pub recipe_id: Option<String>,
    pub servings: Option<i32>,
    pub image: Option<String>,
}

/// Body for POST /api/meal-plans/apply-template.
#[derive(Debug, Deserialize)]
pub struct ApplyTemplateRequest {
    pub template_id: String,
    #[serde(default = "default_week")]
    pub week: String,
}

fn default_week() -> String {
    DEFAULT_WEEK.to_string()
}

#[derive(Debug, Deserialize)]
pub struct WeekQuery {
    #[serde(default = "default_week", deserialize_with = "trimmed_week")]
    pub week: String,
}

fn trimmed_week<'de, D: serde::Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    let raw = String::deserialize(de)?;
    match raw.trim() {
        "" => Ok(default_week()),
        week => Ok(week.to_string()),
    }
}

#[derive(Debug, Deserialize)]
pub struct SyncQuery {
    pub last_sync: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct WeekPlanResponse {
    pub week: String,
    pub meals: WeekMeals,
}

/// A template as listed to users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplateView {
    pub id: String,
    pub key: String,
    pub name: String,
    pub description: String,
    pub meals: WeekMeals,
    pub meal_count: usize,
    pub created_by: String,
    pub is_admin_template: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn week_query_is_trimmed() {
        let q: WeekQuery = serde_json::from_value(json!({ "week": "  Week - 2 " })).unwrap();
        assert_eq!(q.week, "Week - 2");

        let q: WeekQuery = serde_json::from_value(json!({ "week": "   " })).unwrap();
        assert_eq!(q.week, DEFAULT_WEEK);

        let q: WeekQuery = serde_json::from_value(json!({})).unwrap();
        assert_eq!(q.week, DEFAULT_WEEK);
    }
}
