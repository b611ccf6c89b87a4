//! API server configuration.

use std::time::Duration;

use thiserror::Error;
use wisp_core::auth::jwt::{DEFAULT_ACCESS_TTL, DEFAULT_ISSUER, DEFAULT_REFRESH_TTL, TokenConfig};
use wisp_core::auth::session::AdminBootstrap;

/// Default per-request deadline.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// How long in-flight requests get after the listener stops.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:8080").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Redis URL for the revocation list. `None` keeps it in memory.
    pub redis_url: Option<String>,
    /// Signing secrets and token lifetimes.
    pub tokens: TokenConfig,
    /// Admin account created at startup.
    pub admin: AdminBootstrap,
    /// Deadline applied to every request's `RequestContext`.
    pub request_timeout: Duration,
    /// Grace period for in-flight requests on shutdown.
    pub shutdown_timeout: Duration,
}

impl ApiConfig {
    /// Reads configuration from environment variables.
    ///
    /// | Variable                 | Default                          |
    /// |--------------------------|----------------------------------|
    /// | `BIND_ADDR`              | `127.0.0.1:8080`                 |
    /// | `DATABASE_URL`           | `postgres://localhost:5432/wisp` |
    /// | `REDIS_URL`              | unset (in-memory revocation)     |
    /// | `JWT_ACC_SECRET`         | required                         |
    /// | `JWT_REF_SECRET`         | required, must differ            |
    /// | `ACCESS_TOKEN_TTL_SECS`  | `900`                            |
    /// | `REFRESH_TOKEN_TTL_SECS` | `86400`                          |
    /// | `JWT_ISSUER`             | `wisp`                           |
    /// | `ADMIN_EMAIL` / `ADMIN_PASSWORD` | unset (no bootstrap)     |
    /// | `REQUEST_TIMEOUT_SECS`   | `10`                             |
    /// | `SHUTDOWN_TIMEOUT_SECS`  | `2`                              |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let access_secret = var("JWT_ACC_SECRET").ok_or(ConfigError::Missing("JWT_ACC_SECRET"))?;
        let refresh_secret = var("JWT_REF_SECRET").ok_or(ConfigError::Missing("JWT_REF_SECRET"))?;
        if access_secret == refresh_secret {
            return Err(ConfigError::Invalid {
                var: "JWT_REF_SECRET",
                reason: "must differ from JWT_ACC_SECRET".into(),
            });
        }

        let secs = |key: &'static str, default: Duration| -> Result<Duration, ConfigError> {
            match var(key) {
                None => Ok(default),
                Some(raw) => match raw.trim().parse::<u64>() {
                    Ok(0) => Err(ConfigError::Invalid {
                        var: key,
                        reason: "must be greater than zero".into(),
                    }),
                    Ok(n) => Ok(Duration::from_secs(n)),
                    Err(e) => Err(ConfigError::Invalid {
                        var: key,
                        reason: e.to_string(),
                    }),
                },
            }
        };

        Ok(Self {
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:8080".into()),
            database_url: var("DATABASE_URL")
                .unwrap_or_else(|| "postgres://localhost:5432/wisp".into()),
            redis_url: var("REDIS_URL"),
            tokens: TokenConfig {
                access_secret,
                refresh_secret,
                access_ttl: secs("ACCESS_TOKEN_TTL_SECS", DEFAULT_ACCESS_TTL)?,
                refresh_ttl: secs("REFRESH_TOKEN_TTL_SECS", DEFAULT_REFRESH_TTL)?,
                issuer: var("JWT_ISSUER").unwrap_or_else(|| DEFAULT_ISSUER.into()),
            },
            admin: AdminBootstrap {
                email: var("ADMIN_EMAIL"),
                password: var("ADMIN_PASSWORD"),
            },
            request_timeout: secs("REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT)?,
            shutdown_timeout: secs("SHUTDOWN_TIMEOUT_SECS", DEFAULT_SHUTDOWN_TIMEOUT)?,
        })
    }
}
