use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::ApiResult,
    models::{
        auth::AuthenticatedUser,
        meal_plan::{ApplyTemplateRequest, SyncQuery, UpsertMealRequest, WeekPlanResponse, WeekQuery},
    },
    services::meal_plans::MealPlanService,
    AppState,
};

pub async fn get_week(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(q): Query<WeekQuery>,
) -> ApiResult<Json<WeekPlanResponse>> {
    let meals = MealPlanService::week(&state.db, user.user_id, &q.week).await?;
    Ok(Json(WeekPlanResponse { week: q.week, meals }))
}

pub async fn list_weeks(State(state): State<AppState>, user: AuthenticatedUser) -> ApiResult<Json<Value>> {
    let weeks = MealPlanService::weeks(&state.db, user.user_id).await?;
    Ok(Json(json!({ "weeks": weeks })))
}

pub async fn upsert_slot(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<UpsertMealRequest>,
) -> ApiResult<Json<Value>> {
    let entry = MealPlanService::upsert_slot(&state.db, user.user_id, body).await?;
    Ok(Json(json!({ "message": "Meal plan updated", "meal": entry })))
}

pub async fn delete_slot(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    MealPlanService::delete_slot(&state.db, user.user_id, id).await?;
    Ok(Json(json!({ "message": "Meal removed" })))
}

pub async fn clear_week(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(q): Query<WeekQuery>,
) -> ApiResult<Json<Value>> {
    let removed = MealPlanService::clear_week(&state.db, user.user_id, &q.week).await?;
    Ok(Json(json!({ "message": "Meal plan cleared", "removed": removed })))
}

pub async fn admin_templates(State(state): State<AppState>, _user: AuthenticatedUser) -> ApiResult<Json<Value>> {
    let templates = MealPlanService::templates(&state.db, &state.cache).await?;
    Ok(Json(json!({ "templates": templates })))
}

pub async fn apply_template(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<ApplyTemplateRequest>,
) -> ApiResult<Json<Value>> {
    let (week, meals) = MealPlanService::apply_template(&state.db, user.user_id, &body.template_id, &body.week).await?;
    Ok(Json(json!({
        "message": "Template applied successfully",
        "week": week,
        "meals": meals,
    })))
}

pub async fn sync_changes(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(q): Query<SyncQuery>,
) -> ApiResult<Json<Value>> {
    let changes = MealPlanService::changes(&state.db, q.last_sync).await?;
    Ok(Json(json!({
        "notifications": changes,
        "sync_time": chrono::Utc::now(),
    })))
}
