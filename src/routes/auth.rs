use std::time::Duration;

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::{
    error::{ApiError, ApiResult},
    middleware::rate_limit::check_rate_limit,
    models::{
        auth::AuthenticatedUser,
        user::{ChangePasswordRequest, LoginRequest, RegisterRequest, UpdateProfileRequest, UserProfile},
    },
    services::auth::AuthService,
    AppState,
};

fn rate_key(prefix: &str, email: Option<&str>) -> String {
    format!("{prefix}:{}", email.unwrap_or_default().trim().to_lowercase())
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    check_rate_limit(
        &state.cache,
        &rate_key("register", body.email.as_deref()),
        5,
        Duration::from_secs(60),
    )
    .await?;

    let res = AuthService::register(&state.db, body, &state.config.jwt_secret, state.config.jwt_expiry_days).await?;
    Ok((StatusCode::CREATED, Json(json!(res))))
}

pub async fn login(State(state): State<AppState>, Json(body): Json<LoginRequest>) -> ApiResult<Json<Value>> {
    let (Some(email), Some(password)) = (body.email.as_deref(), body.password.as_deref()) else {
        return Err(ApiError::validation("Email and password are required"));
    };
    check_rate_limit(&state.cache, &rate_key("login", Some(email)), 10, Duration::from_secs(15 * 60)).await?;

    let res = AuthService::login(
        &state.db,
        email,
        password,
        &state.config.jwt_secret,
        state.config.jwt_expiry_days,
    )
    .await?;
    Ok(Json(json!(res)))
}

pub async fn verify(State(state): State<AppState>, user: AuthenticatedUser) -> ApiResult<Json<Value>> {
    let u = AuthService::get_user(&state.db, user.user_id)
        .await
        .map_err(|e| match e {
            ApiError::NotFound(_) => ApiError::Unauthorized("User no longer exists".into()),
            other => other,
        })?;
    Ok(Json(json!({ "valid": true, "user": UserProfile::from(u) })))
}

pub async fn change_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<ChangePasswordRequest>,
) -> ApiResult<Json<Value>> {
    AuthService::change_password(
        &state.db,
        user.user_id,
        body.current_password.as_deref().unwrap_or_default(),
        body.new_password.as_deref().unwrap_or_default(),
    )
    .await?;
    Ok(Json(json!({ "message": "Password changed successfully" })))
}

pub async fn get_profile(State(state): State<AppState>, user: AuthenticatedUser) -> ApiResult<Json<Value>> {
    let u = AuthService::get_user(&state.db, user.user_id).await?;
    Ok(Json(json!(UserProfile::from(u))))
}

pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<UpdateProfileRequest>,
) -> ApiResult<Json<Value>> {
    let profile = AuthService::update_profile(&state.db, user.user_id, body).await?;
    Ok(Json(json!({ "message": "Profile updated", "user": profile })))
}
