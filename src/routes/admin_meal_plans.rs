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
        admin::PERM_MEAL_PLANS,
        admin_meal_plan::{CreateAdminMealPlanRequest, UpdateAdminMealPlanRequest},
        auth::AuthenticatedAdmin,
    },
    services::admin_meal_plans::AdminMealPlanService,
    AppState,
};

pub async fn list(State(state): State<AppState>, admin: AuthenticatedAdmin) -> ApiResult<Json<Value>> {
    require_permission(&admin, PERM_MEAL_PLANS)?;
    let plans = AdminMealPlanService::list(&state.db).await?;
    Ok(Json(json!({ "meal_plans": plans })))
}

pub async fn create(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Json(body): Json<CreateAdminMealPlanRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    require_permission(&admin, PERM_MEAL_PLANS)?;
    let plan =
        AdminMealPlanService::create(&state.db, &state.cache, &state.publish_target(), admin.admin_id, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Meal plan created", "meal_plan": plan })),
    ))
}

pub async fn update(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateAdminMealPlanRequest>,
) -> ApiResult<Json<Value>> {
    require_permission(&admin, PERM_MEAL_PLANS)?;
    let plan = AdminMealPlanService::update(&state.db, &state.cache, &state.publish_target(), id, body).await?;
    Ok(Json(json!({ "message": "Meal plan updated", "meal_plan": plan })))
}

pub async fn delete(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    require_permission(&admin, PERM_MEAL_PLANS)?;
    AdminMealPlanService::delete(&state.db, &state.cache, &state.publish_target(), id).await?;
    Ok(Json(json!({ "message": "Meal plan deleted" })))
}

pub async fn mark_processed(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    require_permission(&admin, PERM_MEAL_PLANS)?;
    AdminMealPlanService::mark_processed(&state.db, id).await?;
    Ok(Json(json!({ "message": "Notification marked as processed" })))
}
