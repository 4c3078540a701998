use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::ApiResult,
    models::{
        auth::AuthenticatedUser,
        content::{ClearShoppingQuery, CreateShoppingItemRequest, GenerateShoppingListRequest, UpdateShoppingItemRequest},
    },
    services::shopping::ShoppingService,
    AppState,
};

pub async fn list(State(state): State<AppState>, user: AuthenticatedUser) -> ApiResult<Json<Value>> {
    let items = ShoppingService::list(&state.db, user.user_id).await?;
    Ok(Json(json!({ "items": items })))
}

pub async fn add(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateShoppingItemRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let item = ShoppingService::add(&state.db, user.user_id, body).await?;
    Ok((StatusCode::CREATED, Json(json!({ "item": item }))))
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateShoppingItemRequest>,
) -> ApiResult<Json<Value>> {
    let item = ShoppingService::update(&state.db, user.user_id, id, body).await?;
    Ok(Json(json!({ "item": item })))
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    ShoppingService::delete(&state.db, user.user_id, id).await?;
    Ok(Json(json!({ "message": "Item removed" })))
}

pub async fn clear(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(q): Query<ClearShoppingQuery>,
) -> ApiResult<Json<Value>> {
    let removed = ShoppingService::clear(&state.db, user.user_id, q.checked).await?;
    Ok(Json(json!({ "message": "Shopping list cleared", "removed": removed })))
}

pub async fn generate(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<GenerateShoppingListRequest>,
) -> ApiResult<Json<Value>> {
    let items = ShoppingService::generate(&state.db, user.user_id, &body.week).await?;
    Ok(Json(json!({ "message": "Shopping list generated", "items": items })))
}
