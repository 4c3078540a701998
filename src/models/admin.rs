use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const PERM_ADMIN_MANAGEMENT: &str = "admin_management";
pub const PERM_RECIPES: &str = "recipes";
pub const PERM_MEAL_PLANS: &str = "meal_plans";
pub const PERM_NOTIFICATIONS: &str = "notifications";
pub const PERM_SUBSCRIPTIONS: &str = "subscriptions";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    SuperAdmin,
    SubAdmin,
    MarketingAdmin,
}

impl AdminRole {
    pub fn permissions(&self) -> Vec<String> {
        let perms: &[&str] = match self {
            AdminRole::SuperAdmin => &[
                PERM_ADMIN_MANAGEMENT,
                PERM_RECIPES,
                PERM_MEAL_PLANS,
                PERM_NOTIFICATIONS,
                PERM_SUBSCRIPTIONS,
            ],
            AdminRole::SubAdmin => &[PERM_RECIPES, PERM_MEAL_PLANS, PERM_NOTIFICATIONS],
            AdminRole::MarketingAdmin => &[PERM_NOTIFICATIONS, PERM_SUBSCRIPTIONS],
        };
        perms.iter().map(|p| p.to_string()).collect()
    }
}

impl std::fmt::Display for AdminRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AdminRole::SuperAdmin => "super_admin",
            AdminRole::SubAdmin => "sub_admin",
            AdminRole::MarketingAdmin => "marketing_admin",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for AdminRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(AdminRole::SuperAdmin),
            "sub_admin" => Ok(AdminRole::SubAdmin),
            "marketing_admin" => Ok(AdminRole::MarketingAdmin),
            _ => Err(anyhow::anyhow!("Unknown role: {s}")),
        }
    }
}

/// DB row struct — role is stored as TEXT with a CHECK constraint.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AdminUser {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub role: String,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct AdminProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: AdminRole,
    pub permissions: Vec<String>,
}

impl TryFrom<AdminUser> for AdminProfile {
    type Error = anyhow::Error;

    fn try_from(a: AdminUser) -> Result<Self, Self::Error> {
        let role: AdminRole = a.role.parse()?;
        Ok(Self {
            id: a.id,
            email: a.email,
            name: a.name,
            permissions: role.permissions(),
            role,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AdminLoginResponse {
    pub message: &'static str,
    pub token: String,
    pub admin: AdminProfile,
}

#[derive(Debug, Deserialize)]
pub struct CreateAdminRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_round_trip_through_text() {
        for role in [AdminRole::SuperAdmin, AdminRole::SubAdmin, AdminRole::MarketingAdmin] {
            assert_eq!(role.to_string().parse::<AdminRole>().unwrap(), role);
        }
        assert!("root".parse::<AdminRole>().is_err());
    }

    #[test]
    fn only_super_admin_manages_admins() {
        assert!(AdminRole::SuperAdmin.permissions().contains(&PERM_ADMIN_MANAGEMENT.to_string()));
        assert!(!AdminRole::SubAdmin.permissions().contains(&PERM_ADMIN_MANAGEMENT.to_string()));
        assert!(!AdminRole::MarketingAdmin.permissions().contains(&PERM_MEAL_PLANS.to_string()));
    }
}
