use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Broadcast message shown in the user app.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub target_audience: String,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateNotificationRequest {
    pub title: Option<String>,
    pub message: Option<String>,
    pub target_audience: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct SubscriptionPlan {
    pub id: Uuid,
    pub name: String,
    pub price_cents: i32,
    #[sqlx(rename = "billing_interval")]
    pub interval: String,
    pub features: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpsertSubscriptionPlanRequest {
    pub name: Option<String>,
    pub price_cents: Option<i32>,
    pub interval: Option<String>,
    pub features: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ShoppingListItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub quantity: String,
    pub checked: bool,
    pub source_week: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateShoppingItemRequest {
    pub name: Option<String>,
    pub quantity: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateShoppingItemRequest {
    pub name: Option<String>,
    pub quantity: Option<String>,
    pub checked: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateShoppingListRequest {
    pub week: String,
}

#[derive(Debug, Deserialize)]
pub struct ClearShoppingQuery {
    #[serde(default)]
    pub checked: bool,
}
