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
        admin::PERM_RECIPES,
        auth::{AuthenticatedAdmin, AuthenticatedUser},
        recipe::{CreateRecipeRequest, SaveRecipeRequest, UpdateRecipeRequest},
    },
    services::recipes::RecipeService,
    AppState,
};

const RECIPE_SYNC_LIMIT: i64 = 50;

pub async fn list(State(state): State<AppState>, user: AuthenticatedUser) -> ApiResult<Json<Value>> {
    let (recipes, admin_recipes) = RecipeService::list_for_user(&state.db, user.user_id).await?;
    Ok(Json(json!({ "recipes": recipes, "admin_recipes": admin_recipes })))
}

pub async fn get(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let recipe = RecipeService::get(&state.db, user.user_id, id).await?;
    Ok(Json(json!({ "recipe": recipe })))
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateRecipeRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let recipe = RecipeService::create(&state.db, user.user_id, body).await?;
    Ok((StatusCode::CREATED, Json(json!({ "message": "Recipe created", "recipe": recipe }))))
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateRecipeRequest>,
) -> ApiResult<Json<Value>> {
    let recipe = RecipeService::update(&state.db, user.user_id, id, body).await?;
    Ok(Json(json!({ "message": "Recipe updated", "recipe": recipe })))
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    RecipeService::delete(&state.db, user.user_id, id).await?;
    Ok(Json(json!({ "message": "Recipe deleted" })))
}

/// Body is optional: `{"is_favorite": true}` marks it as a favourite too.
pub async fn save(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    body: Option<Json<SaveRecipeRequest>>,
) -> ApiResult<Json<Value>> {
    let is_favorite = body.map(|Json(b)| b.is_favorite).unwrap_or(false);
    RecipeService::save(&state.db, user.user_id, id, is_favorite).await?;
    Ok(Json(json!({ "message": "Recipe saved" })))
}

pub async fn unsave(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    RecipeService::unsave(&state.db, user.user_id, id).await?;
    Ok(Json(json!({ "message": "Recipe removed from saved" })))
}

pub async fn access(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    RecipeService::touch(&state.db, user.user_id, id).await?;
    Ok(Json(json!({ "message": "Access recorded" })))
}

pub async fn saved(State(state): State<AppState>, user: AuthenticatedUser) -> ApiResult<Json<Value>> {
    let recipes = RecipeService::saved(&state.db, user.user_id).await?;
    Ok(Json(json!({ "recipes": recipes })))
}

// ─── Admin ──────────────────────────────────────────────────────────────────

pub async fn admin_list(State(state): State<AppState>, admin: AuthenticatedAdmin) -> ApiResult<Json<Value>> {
    require_permission(&admin, PERM_RECIPES)?;
    let recipes = RecipeService::admin_list(&state.db).await?;
    Ok(Json(json!({ "recipes": recipes })))
}

pub async fn admin_create(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Json(body): Json<CreateRecipeRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    require_permission(&admin, PERM_RECIPES)?;
    let recipe = RecipeService::admin_create(&state.db, &state.cache, admin.admin_id, body).await?;
    Ok((StatusCode::CREATED, Json(json!({ "message": "Recipe created", "recipe": recipe }))))
}

pub async fn admin_update(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateRecipeRequest>,
) -> ApiResult<Json<Value>> {
    require_permission(&admin, PERM_RECIPES)?;
    let recipe = RecipeService::admin_update(&state.db, &state.cache, id, body).await?;
    Ok(Json(json!({ "message": "Recipe updated", "recipe": recipe })))
}

pub async fn admin_delete(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    require_permission(&admin, PERM_RECIPES)?;
    RecipeService::admin_delete(&state.db, &state.cache, id).await?;
    Ok(Json(json!({ "message": "Recipe deleted" })))
}

/// Public: the user app's discover page.
pub async fn discover(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let recipes = RecipeService::discover(&state.db, &state.cache).await?;
    Ok(Json(json!({ "recipes": recipes })))
}

pub async fn sync(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let changes = RecipeService::changes(&state.db, RECIPE_SYNC_LIMIT).await?;
    Ok(Json(json!({ "notifications": changes })))
}
