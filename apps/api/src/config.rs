use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
    /// Issue a new refresh token on every refresh and blacklist the old one.
    pub rotate_refresh_tokens: bool,
    /// Base URL of the SPA; verification and reset links point here.
    pub frontend_url: String,
    pub require_email_verification: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            jwt_secret: require_env("JWT_SECRET")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: parse_env("PORT", 8080).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            access_token_ttl_minutes: parse_env("ACCESS_TOKEN_TTL_MINUTES", 60)
                .context("ACCESS_TOKEN_TTL_MINUTES must be an integer")?,
            refresh_token_ttl_days: parse_env("REFRESH_TOKEN_TTL_DAYS", 7)
                .context("REFRESH_TOKEN_TTL_DAYS must be an integer")?,
            rotate_refresh_tokens: env_bool("ROTATE_REFRESH_TOKENS").unwrap_or(true),
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            require_email_verification: env_bool("REQUIRE_EMAIL_VERIFICATION").unwrap_or(true),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => Ok(raw.trim().parse::<T>()?),
        Err(_) => Ok(default),
    }
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}
