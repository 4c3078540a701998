pub mod admin;
pub mod admin_meal_plans;
pub mod auth;
pub mod clients;
pub mod health;
pub mod meal_plans;
pub mod metrics;
pub mod notifications;
pub mod recipes;
pub mod shopping;
pub mod subscriptions;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::auth::{AdminJwtSecret, JwtSecret};
use crate::AppState;

const BODY_LIMIT_BYTES: usize = 1024 * 1024;

fn cors(allowed: &[String]) -> CorsLayer {
    let allowed = allowed.to_vec();
    let origin = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
        origin
            .to_str()
            .map(|o| allowed.iter().any(|a| a == o.trim_end_matches('/')))
            .unwrap_or(false)
    });

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(AllowHeaders::list([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]))
        .allow_origin(origin)
}

/// Full HTTP surface: user API, admin API, health and metrics.
pub fn router(state: AppState) -> Router {
    let config = state.config.clone();

    Router::new()
        .route("/api/health", get(health::health_check))
        .route("/metrics", get(metrics::metrics_handler))
        // User auth & profile
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/verify", get(auth::verify))
        .route("/api/auth/change-password", put(auth::change_password))
        .route("/api/profile", get(auth::get_profile).put(auth::update_profile))
        // Recipes
        .route("/api/recipes", get(recipes::list).post(recipes::create))
        .route(
            "/api/recipes/{id}",
            get(recipes::get).put(recipes::update).delete(recipes::delete),
        )
        .route("/api/recipes/{id}/save", post(recipes::save).delete(recipes::unsave))
        .route("/api/recipes/{id}/access", post(recipes::access))
        .route("/api/user-recipes", get(recipes::saved))
        // User meal plans
        .route(
            "/api/meal-plan",
            get(meal_plans::get_week)
                .put(meal_plans::upsert_slot)
                .delete(meal_plans::clear_week),
        )
        .route("/api/meal-plan/weeks", get(meal_plans::list_weeks))
        .route("/api/meal-plan/{id}", delete(meal_plans::delete_slot))
        // Templates & sync
        .route("/api/meal-plans/admin-templates", get(meal_plans::admin_templates))
        .route("/api/meal-plans/apply-template", post(meal_plans::apply_template))
        .route("/api/meal-plans/sync", get(meal_plans::sync_changes))
        // Shopping list
        .route(
            "/api/shopping-list",
            get(shopping::list).post(shopping::add).delete(shopping::clear),
        )
        .route("/api/shopping-list/generate", post(shopping::generate))
        .route("/api/shopping-list/{id}", put(shopping::update).delete(shopping::delete))
        // Nutritionist clients
        .route("/api/clients", get(clients::list).post(clients::create))
        .route("/api/clients/{id}", delete(clients::delete))
        // Notifications & plans
        .route("/api/notifications", get(notifications::list))
        .route("/api/subscription-plans", get(subscriptions::list_active))
        // Admin
        .route("/api/admin/health", get(admin::health))
        .route("/api/admin/auth/login", post(admin::login))
        .route("/api/admin/auth/verify", get(admin::verify))
        .route("/api/admin/auth/logout", post(admin::logout))
        .route("/api/admin/users", get(admin::list_admins).post(admin::create_admin))
        .route("/api/admin/recipes", get(recipes::admin_list).post(recipes::admin_create))
        .route("/api/admin/recipes/discover", get(recipes::discover))
        .route("/api/admin/recipes/sync", get(recipes::sync))
        .route(
            "/api/admin/recipes/{id}",
            put(recipes::admin_update).delete(recipes::admin_delete),
        )
        .route(
            "/api/admin/meal-plans",
            get(admin_meal_plans::list).post(admin_meal_plans::create),
        )
        .route(
            "/api/admin/meal-plans/{id}",
            put(admin_meal_plans::update).delete(admin_meal_plans::delete),
        )
        .route(
            "/api/admin/meal-plans/notifications/{id}/processed",
            post(admin_meal_plans::mark_processed),
        )
        .route("/api/admin/notifications", post(notifications::broadcast))
        .route("/api/admin/notifications/{id}", delete(notifications::deactivate))
        .route(
            "/api/admin/subscription-plans",
            get(subscriptions::admin_list).post(subscriptions::create),
        )
        .route(
            "/api/admin/subscription-plans/{id}",
            put(subscriptions::update).delete(subscriptions::delete),
        )
        .layer(axum::Extension(JwtSecret(config.jwt_secret.clone())))
        .layer(axum::Extension(AdminJwtSecret(config.admin_jwt_secret.clone())))
        .layer(TraceLayer::new_for_http())
        .layer(cors(&config.allowed_origins))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .with_state(state)
}
