use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Someone a nutritionist user manages plans for.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub id: Uuid,
    pub nutritionist_id: Uuid,
    pub name: String,
    pub email: String,
    pub plan: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateClientRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub plan: Option<String>,
}
