use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub redis_url: Option<String>,
    pub jwt_secret: String,
    pub admin_jwt_secret: String,
    pub jwt_expiry_days: u64,
    pub admin_jwt_expiry_hours: u64,
    pub cache_default_ttl_seconds: u64,
    pub cache_max_entries: Option<usize>,
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    // Admin plan fan-out to every user's plan
    pub sync_fan_out: bool,
    pub sync_fan_out_week: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".into())
                .parse()?,
            redis_url: env::var("REDIS_URL").ok().filter(|s| !s.is_empty()),
            jwt_secret: required("JWT_SECRET")?,
            admin_jwt_secret: required("ADMIN_JWT_SECRET")?,
            jwt_expiry_days: env::var("JWT_EXPIRY_DAYS")
                .unwrap_or_else(|_| "7".into())
                .parse()?,
            admin_jwt_expiry_hours: env::var("ADMIN_JWT_EXPIRY_HOURS")
                .unwrap_or_else(|_| "8".into())
                .parse()?,
            cache_default_ttl_seconds: env::var("CACHE_DEFAULT_TTL_SECONDS")
                .unwrap_or_else(|_| "300".into())
                .parse()?,
            cache_max_entries: env::var("CACHE_MAX_ENTRIES").ok().and_then(|v| v.parse().ok()),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "5000".into())
                .parse()?,
            allowed_origins: parse_origins(
                &env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| "http://localhost:3000".into()),
            ),
            sync_fan_out: env::var("SYNC_FAN_OUT")
                .map(|v| !matches!(v.to_lowercase().as_str(), "false" | "0" | "no"))
                .unwrap_or(true),
            sync_fan_out_week: env::var("SYNC_FAN_OUT_WEEK")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "Week - 1".into()),
        })
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("Missing required env var: {}", key))
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_trimmed_and_split() {
        let origins = parse_origins(" http://localhost:3000/ ,https://app.example.com,, ");
        assert_eq!(origins, vec!["http://localhost:3000", "https://app.example.com"]);
    }
}
