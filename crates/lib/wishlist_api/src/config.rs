//! API server configuration.

use axum::http::HeaderValue;
use thiserror::Error;
use wishlist_core::auth::jwt::{DEFAULT_EXPIRATION_MINUTES, JwtSettings, MAX_EXPIRATION_MINUTES};
use wishlist_core::auth::password::DEFAULT_BCRYPT_COST;

/// Default listener address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Default PostgreSQL pool size.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Invalid or missing configuration. Always fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:8080").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    pub database_max_connections: u32,
    /// Token signing and validation parameters.
    pub jwt: JwtSettings,
    /// Origins granted cross-origin access. Empty means none.
    pub cors_allowed_origins: Vec<String>,
    pub bcrypt_cost: u32,
}

impl ApiConfig {
    /// Reads configuration from environment variables.
    ///
    /// | Variable                   | Logical key                           | Default          |
    /// |----------------------------|---------------------------------------|------------------|
    /// | `JWT_KEY`                  | `Jwt:Key`                             | required         |
    /// | `JWT_ISSUER`               | `Jwt:Issuer`                          | required         |
    /// | `JWT_AUDIENCE`             | `Jwt:Audience`                        | required         |
    /// | `JWT_EXPIRATION_MINUTES`   | `Jwt:ExpirationMinutes`               | `60`             |
    /// | `DATABASE_URL`             | `ConnectionStrings:DefaultConnection` | required         |
    /// | `CORS_ALLOWED_ORIGINS`     | `Cors:AllowedOrigins`                 | empty            |
    /// | `BIND_ADDR`                |                                       | `127.0.0.1:8080` |
    /// | `BCRYPT_COST`              |                                       | `10`             |
    /// | `DATABASE_MAX_CONNECTIONS` |                                       | `5`              |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] but reading through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &str, key: &'static str| -> Result<String, ConfigError> {
            lookup(var)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let config = Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into()),
            database_url: required("DATABASE_URL", "ConnectionStrings:DefaultConnection")?,
            database_max_connections: parse_or(
                lookup("DATABASE_MAX_CONNECTIONS"),
                "DATABASE_MAX_CONNECTIONS",
                DEFAULT_MAX_CONNECTIONS,
            )?,
            jwt: JwtSettings {
                key: required("JWT_KEY", "Jwt:Key")?,
                issuer: required("JWT_ISSUER", "Jwt:Issuer")?,
                audience: required("JWT_AUDIENCE", "Jwt:Audience")?,
                expiration_minutes: parse_or(
                    lookup("JWT_EXPIRATION_MINUTES"),
                    "Jwt:ExpirationMinutes",
                    DEFAULT_EXPIRATION_MINUTES,
                )?,
            },
            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                .map(|v| split_origins(&v))
                .unwrap_or_default(),
            bcrypt_cost: parse_or(lookup("BCRYPT_COST"), "BCRYPT_COST", DEFAULT_BCRYPT_COST)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check every rule; the first failure wins.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.key.trim().is_empty() {
            return Err(ConfigError::Missing("Jwt:Key"));
        }
        if self.jwt.issuer.trim().is_empty() {
            return Err(ConfigError::Missing("Jwt:Issuer"));
        }
        if self.jwt.audience.trim().is_empty() {
            return Err(ConfigError::Missing("Jwt:Audience"));
        }
        if !(1..=MAX_EXPIRATION_MINUTES).contains(&self.jwt.expiration_minutes) {
            return Err(ConfigError::Invalid {
                key: "Jwt:ExpirationMinutes",
                reason: format!(
                    "{} is outside 1..={MAX_EXPIRATION_MINUTES}",
                    self.jwt.expiration_minutes
                ),
            });
        }
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::Missing("ConnectionStrings:DefaultConnection"));
        }
        if self.database_max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "DATABASE_MAX_CONNECTIONS",
                reason: "must be greater than zero".into(),
            });
        }
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(ConfigError::Invalid {
                key: "BCRYPT_COST",
                reason: format!("{} is outside 4..=31", self.bcrypt_cost),
            });
        }
        for origin in &self.cors_allowed_origins {
            HeaderValue::from_str(origin).map_err(|_| ConfigError::Invalid {
                key: "Cors:AllowedOrigins",
                reason: format!("{origin:?} is not a valid origin"),
            })?;
        }
        Ok(())
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_or<T: std::str::FromStr>(
    raw: Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some(v) => v.parse().map_err(|_| ConfigError::Invalid {
            key,
            reason: format!("{v:?} is not a number"),
        }),
    }
}
