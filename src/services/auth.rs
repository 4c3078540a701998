use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{
        auth::Claims,
        user::{AuthResponse, RegisterRequest, UpdateProfileRequest, User, UserProfile},
    },
    services::metrics::LOGINS_COUNTER,
};

pub const MAX_INPUT_LEN: usize = 500;
const BCRYPT_COST: u32 = 10;

/// Trims and caps free-form input.
pub fn sanitize(input: &str) -> String {
    input.trim().chars().take(MAX_INPUT_LEN).collect()
}

pub fn validate_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    let local_ok = !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c));
    let host_ok = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    let tld_ok = tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic());
    local_ok && host_ok && tld_ok
}

/// At least 8 characters with one letter and one digit.
pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < 8 {
        return Err(ApiError::validation("Password must be at least 8 characters long"));
    }
    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err(ApiError::validation("Password must contain at least one letter"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ApiError::validation("Password must contain at least one number"));
    }
    Ok(())
}

pub struct AuthService;

impl AuthService {
    pub async fn register(
        pool: &PgPool,
        req: RegisterRequest,
        jwt_secret: &str,
        expiry_days: u64,
    ) -> Result<AuthResponse, ApiError> {
        let email = sanitize(req.email.as_deref().unwrap_or_default()).to_lowercase();
        let password = req.password.unwrap_or_default();
        let name = sanitize(req.name.as_deref().unwrap_or_default());

        if email.is_empty() || password.is_empty() {
            return Err(ApiError::validation("Email and password are required"));
        }
        if !validate_email(&email) {
            return Err(ApiError::validation("Invalid email format"));
        }
        validate_password(&password)?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(&email)
            .fetch_one(pool)
            .await?;
        if exists {
            return Err(ApiError::Conflict("User already exists".into()));
        }

        let hash = bcrypt::hash(&password, BCRYPT_COST).map_err(|e| ApiError::Internal(e.into()))?;
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (email, password_hash, name) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(&email)
        .bind(&hash)
        .bind(&name)
        .fetch_one(pool)
        .await?;

        tracing::info!(user_id = %user.id, "User registered");
        let token = Self::generate_token(&user, jwt_secret, expiry_days)?;
        Ok(AuthResponse {
            message: "User created successfully",
            token,
            user: user.into(),
        })
    }

    pub async fn login(
        pool: &PgPool,
        email: &str,
        password: &str,
        jwt_secret: &str,
        expiry_days: u64,
    ) -> Result<AuthResponse, ApiError> {
        let email = sanitize(email).to_lowercase();
        let invalid = || {
            LOGINS_COUNTER.with_label_values(&["user", "failure"]).inc();
            ApiError::Unauthorized("Invalid credentials".into())
        };

        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(&email)
            .fetch_optional(pool)
            .await?
            .ok_or_else(invalid)?;

        if !bcrypt::verify(password, &user.password_hash).unwrap_or(false) {
            return Err(invalid());
        }

        let user = sqlx::query_as::<_, User>("UPDATE users SET last_login = NOW() WHERE id = $1 RETURNING *")
            .bind(user.id)
            .fetch_one(pool)
            .await?;

        LOGINS_COUNTER.with_label_values(&["user", "success"]).inc();
        let token = Self::generate_token(&user, jwt_secret, expiry_days)?;
        Ok(AuthResponse {
            message: "Login successful",
            token,
            user: user.into(),
        })
    }

    pub fn generate_token(user: &User, secret: &str, expiry_days: u64) -> Result<String, ApiError> {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            iat: now,
            exp: now + (expiry_days * 24 * 3600) as usize,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(e.into()))
    }

    pub async fn get_user(pool: &PgPool, user_id: Uuid) -> Result<User, ApiError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))
    }

    pub async fn update_profile(
        pool: &PgPool,
        user_id: Uuid,
        req: UpdateProfileRequest,
    ) -> Result<UserProfile, ApiError> {
        let preferences = req
            .dietary_preferences
            .map(|prefs| prefs.iter().map(|p| sanitize(p)).filter(|p| !p.is_empty()).collect::<Vec<_>>());
        let user = sqlx::query_as::<_, User>(
            r#"UPDATE users SET
                name = COALESCE($2, name),
                phone = COALESCE($3, phone),
                bio = COALESCE($4, bio),
                dietary_preferences = COALESCE($5, dietary_preferences),
                updated_at = NOW()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(user_id)
        .bind(req.name.as_deref().map(sanitize))
        .bind(req.phone.as_deref().map(sanitize))
        .bind(req.bio.as_deref().map(sanitize))
        .bind(preferences)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
        Ok(user.into())
    }

    pub async fn change_password(
        pool: &PgPool,
        user_id: Uuid,
        current: &str,
        new: &str,
    ) -> Result<(), ApiError> {
        if current.is_empty() || new.is_empty() {
            return Err(ApiError::validation("Current and new password are required"));
        }
        validate_password(new)?;

        let user = Self::get_user(pool, user_id).await?;
        if !bcrypt::verify(current, &user.password_hash).unwrap_or(false) {
            return Err(ApiError::validation("Current password is incorrect"));
        }

        let hash = bcrypt::hash(new, BCRYPT_COST).map_err(|e| ApiError::Internal(e.into()))?;
        sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
            .bind(&hash)
            .bind(user_id)
            .execute(pool)
            .await?;
        tracing::info!(user_id = %user_id, "Password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::decode_access_token;

    fn user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "cook@example.com".into(),
            password_hash: String::new(),
            name: "Cook".into(),
            phone: String::new(),
            bio: String::new(),
            dietary_preferences: vec![],
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn email_format() {
        assert!(validate_email("cook@example.com"));
        assert!(validate_email("first.last+tag@mail.example.org"));
        assert!(!validate_email("cook@example"));
        assert!(!validate_email("@example.com"));
        assert!(!validate_email("cook example@x.com"));
        assert!(!validate_email("cook@example.c"));
    }

    #[test]
    fn password_rules() {
        assert!(validate_password("abcd1234").is_ok());
        assert!(validate_password("abc123").is_err());
        assert!(validate_password("abcdefgh").is_err());
        assert!(validate_password("12345678").is_err());
    }

    #[test]
    fn sanitize_trims_and_caps() {
        assert_eq!(sanitize("  Ana  "), "Ana");
        assert_eq!(sanitize(&"x".repeat(600)).len(), MAX_INPUT_LEN);
    }

    #[test]
    fn issued_token_decodes_to_the_user() {
        let u = user();
        let token = AuthService::generate_token(&u, "secret", 7).unwrap();
        let decoded = decode_access_token(&token, "secret").unwrap();
        assert_eq!(decoded.user_id, u.id);
        assert_eq!(decoded.email, u.email);
        assert!(decode_access_token(&token, "other-secret").is_err());
    }
}
