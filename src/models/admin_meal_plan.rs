use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

use super::meal_plan::WeekMeals;

pub const PLAN_STATUSES: [&str; 3] = ["active", "draft", "archived"];

/// Admin-curated weekly plan. Its meals are mirrored into template rows
/// under `template_key` while the plan is active.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AdminMealPlan {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub week_start: Option<NaiveDate>,
    pub meals: Json<WeekMeals>,
    pub status: String,
    pub template_key: String,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AdminMealPlan {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }
}

/// `meals` stays raw JSON until validated into [`WeekMeals`].
#[derive(Debug, Deserialize)]
pub struct CreateAdminMealPlanRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub week_start: Option<NaiveDate>,
    pub meals: Option<Value>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAdminMealPlanRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub week_start: Option<NaiveDate>,
    pub meals: Option<Value>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    Create,
    Update,
    Delete,
}

impl SyncAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncAction::Create => "create",
            SyncAction::Update => "update",
            SyncAction::Delete => "delete",
        }
    }
}

/// Change feed row polled by the user apps.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MealPlanNotification {
    pub id: Uuid,
    pub action: String,
    pub meal_plan_id: Uuid,
    pub meal_plan_data: Json<Value>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}
