use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::error::ApiError;
use crate::models::auth::{AdminClaims, AuthenticatedAdmin, AuthenticatedUser, Claims};

/// Extension type to carry the user JWT secret through request extensions.
#[derive(Clone)]
pub struct JwtSecret(pub String);

/// Admin tokens are signed with their own secret.
#[derive(Clone)]
pub struct AdminJwtSecret(pub String);

fn bearer_token(parts: &Parts) -> Result<&str, (StatusCode, &'static str)> {
    let auth_header = parts
        .headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or((StatusCode::UNAUTHORIZED, "Missing Authorization header"))?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or((StatusCode::UNAUTHORIZED, "Invalid Authorization header format"))
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;

        let secret = parts
            .extensions
            .get::<JwtSecret>()
            .ok_or((StatusCode::INTERNAL_SERVER_ERROR, "JWT secret not configured"))?;

        decode_access_token(token, &secret.0).map_err(|_| (StatusCode::UNAUTHORIZED, "Invalid or expired token"))
    }
}

impl<S> FromRequestParts<S> for AuthenticatedAdmin
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;

        let secret = parts
            .extensions
            .get::<AdminJwtSecret>()
            .ok_or((StatusCode::INTERNAL_SERVER_ERROR, "Admin JWT secret not configured"))?;

        decode_admin_token(token, &secret.0).map_err(|_| (StatusCode::UNAUTHORIZED, "Invalid or expired token"))
    }
}

fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.leeway = 0;
    validation
}

pub fn decode_access_token(token: &str, secret: &str) -> Result<AuthenticatedUser, anyhow::Error> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let claims = decode::<Claims>(token, &key, &validation())?.claims;

    Ok(AuthenticatedUser {
        user_id: claims.sub.parse()?,
        email: claims.email,
    })
}

pub fn decode_admin_token(token: &str, secret: &str) -> Result<AuthenticatedAdmin, anyhow::Error> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let claims = decode::<AdminClaims>(token, &key, &validation())?.claims;

    Ok(AuthenticatedAdmin {
        admin_id: claims.sub.parse()?,
        email: claims.email,
        role: claims.role,
        permissions: claims.permissions,
        session_id: claims.jti,
    })
}

/// 403 unless the admin's role grants `permission`.
pub fn require_permission(admin: &AuthenticatedAdmin, permission: &str) -> Result<(), ApiError> {
    if admin.can(permission) {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Insufficient permissions".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::Claims;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(exp_offset: i64) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: uuid::Uuid::new_v4().to_string(),
            email: "a@b.co".into(),
            iat: now as usize,
            exp: (now + exp_offset) as usize,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(b"s")).unwrap()
    }

    #[test]
    fn expired_tokens_are_rejected() {
        assert!(decode_access_token(&token(3600), "s").is_ok());
        assert!(decode_access_token(&token(-60), "s").is_err());
    }

    #[test]
    fn user_tokens_are_not_admin_tokens() {
        assert!(decode_admin_token(&token(3600), "s").is_err());
    }
}
