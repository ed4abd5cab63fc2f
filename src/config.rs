// src/config.rs

use std::{env, path::PathBuf};

use dotenvy::dotenv;

/// Errors raised while reading the environment at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{0} has an invalid value: {1}")]
    Invalid(&'static str, String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub rust_log: String,
    pub port: u16,

    /// Turns on the `Secure` cookie attribute.
    pub production: bool,

    /// Directory where uploaded PDFs are written and served from.
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,

    pub session_ttl_days: i64,

    /// Public base of the video-conferencing service, e.g. `https://meet.jit.si`.
    pub meeting_base_url: String,
    pub meeting_room_prefix: String,

    pub admin_email: Option<String>,
    pub admin_password: Option<String>,

    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let production = env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            database_url,
            rust_log,
            port: parse_or("PORT", 3000)?,
            production,
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),
            max_upload_bytes: upload_limit_bytes(parse_or("MAX_UPLOAD_MB", 50)?)?,
            session_ttl_days: session_ttl_days(parse_or("SESSION_TTL_DAYS", 7)?)?,
            meeting_base_url: env::var("MEETING_BASE_URL")
                .unwrap_or_else(|_| "https://meet.jit.si".to_string()),
            meeting_room_prefix: env::var("MEETING_ROOM_PREFIX")
                .unwrap_or_else(|_| "edurenfort".to_string()),
            admin_email: env::var("ADMIN_EMAIL").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            cors_origins,
        })
    }
}

fn parse_or<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(key, raw)),
        Err(_) => Ok(default),
    }
}

/// Longest session lifetime accepted from the environment.
const MAX_SESSION_TTL_DAYS: i64 = 365;

fn upload_limit_bytes(megabytes: usize) -> Result<usize, ConfigError> {
    if megabytes == 0 {
        return Err(ConfigError::Invalid("MAX_UPLOAD_MB", megabytes.to_string()));
    }
    megabytes
        .checked_mul(1024 * 1024)
        .ok_or_else(|| ConfigError::Invalid("MAX_UPLOAD_MB", megabytes.to_string()))
}

fn session_ttl_days(days: i64) -> Result<i64, ConfigError> {
    if (1..=MAX_SESSION_TTL_DAYS).contains(&days) {
        Ok(days)
    } else {
        Err(ConfigError::Invalid("SESSION_TTL_DAYS", days.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_limit_is_converted_to_bytes() {
        assert_eq!(upload_limit_bytes(50).unwrap(), 50 * 1024 * 1024);
    }

    #[test]
    fn upload_limit_rejects_zero_and_overflow() {
        assert!(matches!(
            upload_limit_bytes(0),
            Err(ConfigError::Invalid("MAX_UPLOAD_MB", _))
        ));
        assert!(matches!(
            upload_limit_bytes(usize::MAX),
            Err(ConfigError::Invalid("MAX_UPLOAD_MB", _))
        ));
    }

    #[test]
    fn session_ttl_must_be_positive_and_bounded() {
        assert_eq!(session_ttl_days(7).unwrap(), 7);
        for days in [0, -3, MAX_SESSION_TTL_DAYS + 1, i64::MAX] {
            assert!(
                matches!(session_ttl_days(days), Err(ConfigError::Invalid("SESSION_TTL_DAYS", _))),
                "{days} days"
            );
        }
    }
}
