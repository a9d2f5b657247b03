use std::{net::SocketAddr, path::PathBuf};

use chrono::Duration;
use services::services::auth::DEFAULT_TOKEN_TTL_MINUTES;
use thiserror::Error;

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173,http://127.0.0.1:5173";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub admin: Option<AdminBootstrap>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = var("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let database_url = var("DATABASE_URL").unwrap_or_else(|| {
            format!("sqlite://{}", utils::assets::data_dir().join("escola.db").display())
        });

        let ttl_minutes = match var("ACCESS_TOKEN_EXPIRE_MINUTES") {
            Some(value) => value
                .parse::<i64>()
                .ok()
                .filter(|m| *m > 0)
                .ok_or(ConfigError::Invalid {
                    var: "ACCESS_TOKEN_EXPIRE_MINUTES",
                    value,
                })?,
            None => DEFAULT_TOKEN_TTL_MINUTES,
        };

        let port = match var("PORT") {
            Some(value) => value
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { var: "PORT", value })?,
            None => 8000,
        };

        let cors_origins = var("CORS_ORIGINS")
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        let admin = match (var("ADMIN_EMAIL"), var("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminBootstrap { email, password }),
            _ => None,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            token_ttl: Duration::minutes(ttl_minutes),
            host: var("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            cors_origins,
            admin,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::Invalid {
                var: "HOST",
                value: self.host.clone(),
            })
    }

    /// Path of the database file, when the URL points at one.
    pub fn sqlite_file(&self) -> Option<PathBuf> {
        let path = self
            .database_url
            .strip_prefix("sqlite://")
            .or_else(|| self.database_url.strip_prefix("sqlite:"))?;
        let path = path.split('?').next().unwrap_or(path);
        if path.is_empty() || path == ":memory:" {
            return None;
        }
        Some(PathBuf::from(path))
    }
}
