//! Application configuration loaded from environment variables.

use std::env;
use std::str::FromStr;

use blog_core::services::Registration;
use blog_infra::auth::{DEV_SECRET, JwtConfig};
use blog_infra::database::DatabaseConfig;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// `None` runs the server on the in-memory backend.
    pub database: Option<DatabaseConfig>,
    /// Apply pending migrations before serving.
    pub auto_migrate: bool,
    pub jwt: JwtConfig,
    /// Allow unauthenticated callers to read posts, categories and tags.
    pub anonymous_reads: bool,
    pub default_page_size: u64,
    /// Superuser created at startup when missing.
    pub admin: Option<Registration>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let database = env::var("DATABASE_URL").ok().map(|url| DatabaseConfig {
            url,
            max_connections: env_parse("DB_MAX_CONNECTIONS", 100),
            min_connections: env_parse("DB_MIN_CONNECTIONS", 10),
        });

        let jwt = JwtConfig {
            secret: env::var("JWT_SECRET").unwrap_or_else(|_| DEV_SECRET.to_string()),
            expiration_hours: env_parse("JWT_EXPIRATION_HOURS", 24),
            issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "blog-api".to_string()),
        };

        let admin = match (
            env::var("ADMIN_EMAIL"),
            env::var("ADMIN_USERNAME"),
            env::var("ADMIN_PASSWORD"),
        ) {
            (Ok(email), Ok(username), Ok(password)) => Some(Registration {
                email,
                username,
                password,
            }),
            _ => None,
        };

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env_parse("PORT", 8080),
            database,
            auto_migrate: env_flag("DB_AUTO_MIGRATE", false),
            jwt,
            anonymous_reads: env_flag("ANONYMOUS_READS", true),
            default_page_size: env_parse("DEFAULT_PAGE_SIZE", 10),
            admin,
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|v| parse_flag(&v))
        .unwrap_or(default)
}

/// Reads the usual spellings of a boolean switch.
pub(crate) fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
