//! Environment configuration for the API server.

use clipmark_core::{Error, Result};
use clipmark_provider::GoogleOAuthConfig;

/// Runtime environment mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn from_env() -> Self {
        match std::env::var("ENVIRONMENT").as_deref() {
            Ok("production") => Environment::Production,
            _ => Environment::Development,
        }
    }

    /// Internal error details are suppressed outside development.
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// Complete API configuration read once at startup.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub database_url: String,
    pub oauth: GoogleOAuthConfig,
    pub port: u16,
    pub session_ttl_hours: i64,
    pub environment: Environment,
}

impl ApiConfig {
    /// Read configuration from the environment. `.env` is honored in
    /// development via dotenvy, loaded by the caller before this runs.
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| Error::Config("DATABASE_URL not set".to_string()))?;

        let port = std::env::var("PORT")
            .ok()
            .map(|v| {
                v.parse::<u16>()
                    .map_err(|_| Error::Config(format!("invalid PORT: {}", v)))
            })
            .transpose()?
            .unwrap_or(3000);

        let session_ttl_hours = std::env::var("SESSION_TTL_HOURS")
            .ok()
            .map(|v| {
                v.parse::<i64>()
                    .map_err(|_| Error::Config(format!("invalid SESSION_TTL_HOURS: {}", v)))
            })
            .transpose()?
            .unwrap_or(clipmark_core::defaults::SESSION_TTL_HOURS);

        Ok(Self {
            database_url,
            oauth: GoogleOAuthConfig::from_env()?,
            port,
            session_ttl_hours,
            environment: Environment::from_env(),
        })
    }
}
