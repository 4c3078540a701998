pub mod admin;
pub mod admin_meal_plans;
pub mod auth;
pub mod clients;
pub mod meal_plans;
pub mod metrics;
pub mod notifications;
pub mod recipes;
pub mod shopping;
pub mod subscriptions;
pub mod sync;
pub mod templates;
