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
    models::{admin::PERM_SUBSCRIPTIONS, auth::AuthenticatedAdmin, content::UpsertSubscriptionPlanRequest},
    services::subscriptions::SubscriptionService,
    AppState,
};

/// Public pricing page.
pub async fn list_active(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let plans = SubscriptionService::active(&state.db, &state.cache).await?;
    Ok(Json(json!({ "plans": plans })))
}

pub async fn admin_list(State(state): State<AppState>, admin: AuthenticatedAdmin) -> ApiResult<Json<Value>> {
    require_permission(&admin, PERM_SUBSCRIPTIONS)?;
    let plans = SubscriptionService::list_all(&state.db).await?;
    Ok(Json(json!({ "plans": plans })))
}

pub async fn create(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Json(body): Json<UpsertSubscriptionPlanRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    require_permission(&admin, PERM_SUBSCRIPTIONS)?;
    let plan = SubscriptionService::create(&state.db, &state.cache, body).await?;
    Ok((StatusCode::CREATED, Json(json!({ "plan": plan }))))
}

pub async fn update(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Path(id): Path<Uuid>,
    Json(body): Json<UpsertSubscriptionPlanRequest>,
) -> ApiResult<Json<Value>> {
    require_permission(&admin, PERM_SUBSCRIPTIONS)?;
    let plan = SubscriptionService::update(&state.db, &state.cache, id, body).await?;
    Ok(Json(json!({ "plan": plan })))
}

pub async fn delete(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    require_permission(&admin, PERM_SUBSCRIPTIONS)?;
    SubscriptionService::delete(&state.db, &state.cache, id).await?;
    Ok(Json(json!({ "message": "Plan deleted" })))
}
