use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::content::{CreateNotificationRequest, Notification},
    services::auth::sanitize,
};

pub const DEFAULT_AUDIENCE: &str = "All Users";

pub struct NotificationService;

impl NotificationService {
    /// Active broadcasts, newest first.
    pub async fn active(pool: &PgPool) -> Result<Vec<Notification>, ApiError> {
        let rows = sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE is_active ORDER BY created_at DESC LIMIT 100",
        )
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn broadcast(
        pool: &PgPool,
        admin_id: Uuid,
        req: CreateNotificationRequest,
    ) -> Result<Notification, ApiError> {
        let title = sanitize(req.title.as_deref().unwrap_or_default());
        let message = sanitize(req.message.as_deref().unwrap_or_default());
        if title.is_empty() || message.is_empty() {
            return Err(ApiError::validation("Title and message are required"));
        }
        let audience = req
            .target_audience
            .as_deref()
            .map(sanitize)
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| DEFAULT_AUDIENCE.to_string());

        let row = sqlx::query_as::<_, Notification>(
            "INSERT INTO notifications (title, message, target_audience, created_by)
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(&title)
        .bind(&message)
        .bind(&audience)
        .bind(admin_id)
        .fetch_one(pool)
        .await?;

        tracing::info!(notification_id = %row.id, audience = %row.target_audience, "Notification broadcast");
        Ok(row)
    }

    pub async fn deactivate(pool: &PgPool, id: Uuid) -> Result<(), ApiError> {
        let res = sqlx::query("UPDATE notifications SET is_active = FALSE WHERE id = $1 AND is_active")
            .bind(id)
            .execute(pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(ApiError::not_found("Notification not found"));
        }
        Ok(())
    }
}
