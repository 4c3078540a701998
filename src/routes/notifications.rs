use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::ApiResult,
    middleware::auth::require_permission,
    models::{
        admin::PERM_NOTIFICATIONS,
        auth::{AuthenticatedAdmin, AuthenticatedUser},
        content::CreateNotificationRequest,
    },
    services::notifications::NotificationService,
    AppState,
};

pub async fn list(State(state): State<AppState>, _user: AuthenticatedUser) -> ApiResult<Json<Value>> {
    let notifications = NotificationService::active(&state.db).await?;
    Ok(Json(json!({ "notifications": notifications })))
}

pub async fn broadcast(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Json(body): Json<CreateNotificationRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    require_permission(&admin, PERM_NOTIFICATIONS)?;
    let notification = NotificationService::broadcast(&state.db, admin.admin_id, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Notification sent", "notification": notification })),
    ))
}

pub async fn deactivate(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    require_permission(&admin, PERM_NOTIFICATIONS)?;
    NotificationService::deactivate(&state.db, id).await?;
    Ok(Json(json!({ "message": "Notification removed" })))
}
