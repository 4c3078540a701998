use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{
        admin::{AdminLoginResponse, AdminProfile, AdminRole, AdminUser, CreateAdminRequest},
        auth::AdminClaims,
    },
    services::{
        auth::{sanitize, validate_email, validate_password},
        metrics::LOGINS_COUNTER,
    },
};

const BCRYPT_COST: u32 = 10;

pub fn hash_session_id(session_id: &str) -> String {
    hex::encode(Sha256::digest(session_id.as_bytes()))
}

fn new_session_id() -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// Request metadata stored alongside a session.
#[derive(Debug, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: String,
}

pub struct AdminService;

impl AdminService {
    pub async fn login(
        pool: &PgPool,
        email: &str,
        password: &str,
        client: ClientInfo,
        secret: &str,
        expiry_hours: u64,
    ) -> Result<AdminLoginResponse, ApiError> {
        let email = sanitize(email).to_lowercase();
        let invalid = || {
            LOGINS_COUNTER.with_label_values(&["admin", "failure"]).inc();
            ApiError::Unauthorized("Invalid credentials".into())
        };

        let admin = sqlx::query_as::<_, AdminUser>(
            "SELECT * FROM admin_users WHERE email = $1 AND is_active = TRUE",
        )
        .bind(&email)
        .fetch_optional(pool)
        .await?
        .ok_or_else(invalid)?;

        if !bcrypt::verify(password, &admin.password_hash).unwrap_or(false) {
            return Err(invalid());
        }

        let profile = AdminProfile::try_from(admin)?;
        let session_id = new_session_id();
        let token = Self::generate_token(&profile, &session_id, secret, expiry_hours)?;
        let expires_at = Utc::now() + chrono::Duration::hours(expiry_hours as i64);

        sqlx::query(
            "INSERT INTO admin_sessions (admin_id, token_hash, expires_at, ip_address, user_agent)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(profile.id)
        .bind(hash_session_id(&session_id))
        .bind(expires_at)
        .bind(&client.ip_address)
        .bind(&client.user_agent)
        .execute(pool)
        .await?;

        sqlx::query("UPDATE admin_users SET last_login = NOW() WHERE id = $1")
            .bind(profile.id)
            .execute(pool)
            .await?;

        LOGINS_COUNTER.with_label_values(&["admin", "success"]).inc();
        tracing::info!(admin_id = %profile.id, role = %profile.role, "Admin logged in");
        Ok(AdminLoginResponse {
            message: "Login successful",
            token,
            admin: profile,
        })
    }

    pub fn generate_token(
        admin: &AdminProfile,
        session_id: &str,
        secret: &str,
        expiry_hours: u64,
    ) -> Result<String, ApiError> {
        let now = Utc::now().timestamp() as usize;
        let claims = AdminClaims {
            sub: admin.id.to_string(),
            email: admin.email.clone(),
            role: admin.role,
            permissions: admin.permissions.clone(),
            jti: session_id.to_string(),
            iat: now,
            exp: now + (expiry_hours * 3600) as usize,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(e.into()))
    }

    /// Profile of the admin behind a live session.
    pub async fn verify(pool: &PgPool, admin_id: Uuid, session_id: &str) -> Result<AdminProfile, ApiError> {
        let admin = sqlx::query_as::<_, AdminUser>(
            "SELECT a.* FROM admin_users a
             JOIN admin_sessions s ON s.admin_id = a.id
             WHERE a.id = $1 AND a.is_active = TRUE AND s.token_hash = $2 AND s.expires_at > NOW()",
        )
        .bind(admin_id)
        .bind(hash_session_id(session_id))
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Session expired".into()))?;
        Ok(AdminProfile::try_from(admin)?)
    }

    /// Ends every session of the admin, plus any expired ones.
    pub async fn logout(pool: &PgPool, admin_id: Uuid) -> Result<u64, ApiError> {
        let res = sqlx::query("DELETE FROM admin_sessions WHERE admin_id = $1 OR expires_at < NOW()")
            .bind(admin_id)
            .execute(pool)
            .await?;
        Ok(res.rows_affected())
    }

    pub async fn list_admins(pool: &PgPool) -> Result<Vec<AdminUser>, ApiError> {
        let admins = sqlx::query_as::<_, AdminUser>("SELECT * FROM admin_users ORDER BY created_at DESC")
            .fetch_all(pool)
            .await?;
        Ok(admins)
    }

    pub async fn create_admin(
        pool: &PgPool,
        req: CreateAdminRequest,
        created_by: Option<Uuid>,
    ) -> Result<AdminUser, ApiError> {
        let email = sanitize(req.email.as_deref().unwrap_or_default()).to_lowercase();
        let name = sanitize(req.name.as_deref().unwrap_or_default());
        let password = req.password.unwrap_or_default();
        let role = req.role.unwrap_or_default();

        if email.is_empty() || name.is_empty() || password.is_empty() || role.is_empty() {
            return Err(ApiError::validation("Email, password, name and role are required"));
        }
        if !validate_email(&email) {
            return Err(ApiError::validation("Invalid email format"));
        }
        validate_password(&password)?;
        let role: AdminRole = role
            .parse()
            .map_err(|_| ApiError::validation("Invalid role"))?;

        let hash = bcrypt::hash(&password, BCRYPT_COST).map_err(|e| ApiError::Internal(e.into()))?;
        let admin = sqlx::query_as::<_, AdminUser>(
            "INSERT INTO admin_users (email, password_hash, name, role, created_by)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(&email)
        .bind(&hash)
        .bind(&name)
        .bind(role.to_string())
        .bind(created_by)
        .fetch_one(pool)
        .await
        .map_err(|e| match ApiError::from(e) {
            ApiError::Conflict(_) => ApiError::Conflict("Admin with this email already exists".into()),
            other => other,
        })?;

        tracing::info!(admin_id = %admin.id, role = %role, "Admin account created");
        Ok(admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::decode_admin_token;

    #[test]
    fn session_hash_is_stable_hex() {
        let h = hash_session_id("abc");
        assert_eq!(h.len(), 64);
        assert_eq!(h, hash_session_id("abc"));
        assert_ne!(h, hash_session_id("abd"));
    }

    #[test]
    fn session_ids_are_random() {
        let a = new_session_id();
        assert_eq!(a.len(), 32);
        assert_ne!(a, new_session_id());
    }

    #[test]
    fn admin_token_carries_role_and_permissions() {
        let profile = AdminProfile {
            id: Uuid::new_v4(),
            email: "ops@example.com".into(),
            name: "Ops".into(),
            role: AdminRole::SubAdmin,
            permissions: AdminRole::SubAdmin.permissions(),
        };
        let token = AdminService::generate_token(&profile, "sess", "admin-secret", 8).unwrap();
        let admin = decode_admin_token(&token, "admin-secret").unwrap();
        assert_eq!(admin.admin_id, profile.id);
        assert_eq!(admin.role, AdminRole::SubAdmin);
        assert_eq!(admin.session_id, "sess");
        assert!(admin.can("recipes"));
        assert!(!admin.can("admin_management"));
        assert!(decode_admin_token(&token, "user-secret").is_err());
    }
}
