pub mod admin;
pub mod admin_meal_plan;
pub mod auth;
pub mod client;
pub mod content;
pub mod meal_plan;
pub mod recipe;
pub mod user;
