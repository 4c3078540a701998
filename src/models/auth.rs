use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::admin::AdminRole;

/// Claims embedded in the user JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user UUID
    pub email: String,
    pub exp: usize,
    pub iat: usize,
}

/// Claims embedded in the admin JWT (signed with a separate secret)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminClaims {
    pub sub: String, // admin UUID
    pub email: String,
    pub role: AdminRole,
    pub permissions: Vec<String>,
    /// Random session id; its sha256 is stored in `admin_sessions`.
    pub jti: String,
    pub exp: usize,
    pub iat: usize,
}

/// Extracted from a validated user JWT — available via Axum extractors
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
}

/// Extracted from a validated admin JWT
#[derive(Debug, Clone)]
pub struct AuthenticatedAdmin {
    pub admin_id: Uuid,
    pub email: String,
    pub role: AdminRole,
    pub permissions: Vec<String>,
    pub session_id: String,
}

impl AuthenticatedAdmin {
    pub fn can(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}
