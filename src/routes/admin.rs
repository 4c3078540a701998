use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::{json, Value};

use crate::{
    db,
    error::{ApiError, ApiResult},
    middleware::{auth::require_permission, rate_limit::check_rate_limit},
    models::{
        admin::{AdminLoginRequest, CreateAdminRequest, PERM_ADMIN_MANAGEMENT},
        auth::AuthenticatedAdmin,
    },
    services::admin::{AdminService, ClientInfo},
    AppState,
};

fn client_info(headers: &HeaderMap) -> ClientInfo {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    ClientInfo {
        ip_address: header("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .or_else(|| header("x-real-ip"))
            .map(|ip| ip.trim().to_string()),
        user_agent: header("user-agent").unwrap_or_default().chars().take(500).collect(),
    }
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<AdminLoginRequest>,
) -> ApiResult<Json<Value>> {
    let (Some(email), Some(password)) = (body.email.as_deref(), body.password.as_deref()) else {
        return Err(ApiError::validation("Email and password are required"));
    };
    let key = format!("admin_login:{}", email.trim().to_lowercase());
    check_rate_limit(&state.cache, &key, 10, Duration::from_secs(15 * 60)).await?;

    let res = AdminService::login(
        &state.db,
        email,
        password,
        client_info(&headers),
        &state.config.admin_jwt_secret,
        state.config.admin_jwt_expiry_hours,
    )
    .await?;
    Ok(Json(json!(res)))
}

pub async fn verify(State(state): State<AppState>, admin: AuthenticatedAdmin) -> ApiResult<Json<Value>> {
    let profile = AdminService::verify(&state.db, admin.admin_id, &admin.session_id).await?;
    Ok(Json(json!({ "valid": true, "admin": profile })))
}

pub async fn logout(State(state): State<AppState>, admin: AuthenticatedAdmin) -> ApiResult<Json<Value>> {
    AdminService::logout(&state.db, admin.admin_id).await?;
    tracing::info!(admin_id = %admin.admin_id, "Admin logged out");
    Ok(Json(json!({ "message": "Logged out successfully" })))
}

pub async fn list_admins(State(state): State<AppState>, admin: AuthenticatedAdmin) -> ApiResult<Json<Value>> {
    require_permission(&admin, PERM_ADMIN_MANAGEMENT)?;
    let admins = AdminService::list_admins(&state.db).await?;
    Ok(Json(json!({ "admins": admins })))
}

pub async fn create_admin(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Json(body): Json<CreateAdminRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    require_permission(&admin, PERM_ADMIN_MANAGEMENT)?;
    let created = AdminService::create_admin(&state.db, body, Some(admin.admin_id)).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Admin user created successfully", "admin": created })),
    ))
}

/// Database reachability, for the admin panel.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match db::ping(&state.db).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "db": "connected", "cache": state.cache.backend() })),
        ),
        Err(e) => {
            tracing::warn!("Admin health check failed: {e}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "error", "db": "unreachable", "cache": state.cache.backend() })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn client_info_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.1, 10.0.0.2"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.9.9.9"));
        headers.insert("user-agent", HeaderValue::from_static("curl/8"));
        let info = client_info(&headers);
        assert_eq!(info.ip_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(info.user_agent, "curl/8");

        let info = client_info(&HeaderMap::new());
        assert_eq!(info.ip_address, None);
        assert_eq!(info.user_agent, "");
    }
}
