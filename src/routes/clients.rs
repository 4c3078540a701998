use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::ApiResult,
    models::{auth::AuthenticatedUser, client::CreateClientRequest},
    services::clients::ClientService,
    AppState,
};

pub async fn list(State(state): State<AppState>, user: AuthenticatedUser) -> ApiResult<Json<Value>> {
    let clients = ClientService::list(&state.db, user.user_id).await?;
    Ok(Json(json!({ "clients": clients })))
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateClientRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let client = ClientService::create(&state.db, user.user_id, body).await?;
    Ok((StatusCode::CREATED, Json(json!({ "message": "Client added", "client": client }))))
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    ClientService::delete(&state.db, user.user_id, id).await?;
    Ok(Json(json!({ "message": "Client deleted successfully" })))
}
