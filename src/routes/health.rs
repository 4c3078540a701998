use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::AppState;

/// Liveness only; `/api/admin/health` also checks the database.
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "status": "ok", "cache": state.cache.backend() }))
}
