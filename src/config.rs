//! Environment-driven configuration, read once at startup.

use std::time::Duration;

use bcrypt::{hash, DEFAULT_COST};
use thiserror::Error;

/// Development-only signing secret used when `JWT_SECRET` is unset.
pub const DEV_JWT_SECRET: &str = "dev-only-jwt-secret-change-me";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set to a unique value in production")]
    InsecureJwtSecret,

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },

    #[error("failed to hash ADMIN_PASSWORD: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn from_env() -> Self {
        match std::env::var("ENVIRONMENT").as_deref() {
            Ok("production") => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

/// The single admin identity allowed to log in.
#[derive(Debug, Clone)]
pub struct AdminCredentials {
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: String,
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(15 * 60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub admin: Option<AdminCredentials>,
    pub cloudinary: Option<CloudinaryConfig>,
    pub rate_limit: RateLimitConfig,
}

fn non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match non_empty(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = Environment::from_env();

        let jwt_secret = match non_empty("JWT_SECRET") {
            Some(secret) if secret != DEV_JWT_SECRET => secret,
            _ if environment.is_production() => return Err(ConfigError::InsecureJwtSecret),
            _ => {
                tracing::warn!("JWT_SECRET not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        Ok(Self {
            environment,
            host: non_empty("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or("PORT", 5000)?,
            jwt_secret,
            admin: admin_from_env()?,
            cloudinary: cloudinary_from_env(),
            rate_limit: rate_limit_from_env()?,
        })
    }
}

fn rate_limit_from_env() -> Result<RateLimitConfig, ConfigError> {
    let defaults = RateLimitConfig::default();
    Ok(RateLimitConfig {
        max_requests: parse_or("RATE_LIMIT_MAX", defaults.max_requests)?,
        window: Duration::from_secs(parse_or(
            "RATE_LIMIT_WINDOW_SECS",
            defaults.window.as_secs(),
        )?),
    })
}

fn admin_from_env() -> Result<Option<AdminCredentials>, ConfigError> {
    let Some(email) = non_empty("ADMIN_EMAIL") else {
        tracing::warn!("ADMIN_EMAIL not set, admin login is disabled");
        return Ok(None);
    };

    let password_hash = if let Some(hashed) = non_empty("ADMIN_HASH_PASSWORD") {
        hashed
    } else if let Some(plain) = non_empty("ADMIN_PASSWORD") {
        hash(plain, DEFAULT_COST)?
    } else {
        tracing::warn!("neither ADMIN_HASH_PASSWORD nor ADMIN_PASSWORD is set, admin login is disabled");
        return Ok(None);
    };

    Ok(Some(AdminCredentials {
        email,
        password_hash,
    }))
}

fn cloudinary_from_env() -> Option<CloudinaryConfig> {
    let cloud_name = non_empty("CLOUDINARY_CLOUD_NAME");
    let api_key = non_empty("CLOUDINARY_API_KEY");
    let api_secret = non_empty("CLOUDINARY_API_SECRET");

    match (cloud_name, api_key, api_secret) {
        (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryConfig {
            cloud_name,
            api_key,
            api_secret,
            folder: non_empty("CLOUDINARY_FOLDER")
                .unwrap_or_else(|| "photography-portfolio".to_string()),
        }),
        _ => {
            tracing::warn!("Cloudinary credentials incomplete, image uploads are disabled");
            None
        }
    }
}
