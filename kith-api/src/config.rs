//! API Configuration Module
//!
//! Server-level settings: bind address, CORS, deployment environment and
//! startup behaviour. Loaded from environment variables with development
//! defaults.

use std::net::SocketAddr;

use crate::error::{ApiError, ApiResult};

// ============================================================================
// ENVIRONMENT
// ============================================================================

/// Deployment environment (`KITH_ENVIRONMENT`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "test" | "testing" => Environment::Test,
            _ => Environment::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Interface to bind (`KITH_API_BIND`).
    pub bind_host: String,

    /// Port (`PORT`, then `KITH_API_PORT`).
    pub port: u16,

    /// Allowed CORS origins. Empty means allow all (dev mode).
    /// Entries may use `*.example.com` to allow any https subdomain.
    pub cors_origins: Vec<String>,

    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    pub environment: Environment,

    /// Apply pending migrations before serving (`KITH_AUTO_MIGRATE`).
    pub auto_migrate: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origins: Vec::new(),
            cors_allow_credentials: false,
            cors_max_age_secs: 86400,
            environment: Environment::Development,
            auto_migrate: false,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `KITH_API_BIND`: interface (default: 0.0.0.0)
    /// - `PORT` / `KITH_API_PORT`: port (default: 3000)
    /// - `KITH_CORS_ORIGINS`: comma-separated allowed origins (empty = allow all)
    /// - `KITH_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `KITH_CORS_MAX_AGE_SECS`: preflight cache duration (default: 86400)
    /// - `KITH_ENVIRONMENT`: development | test | production
    /// - `KITH_AUTO_MIGRATE`: "true" to migrate at startup
    pub fn from_env() -> ApiResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary variable source.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> ApiResult<Self> {
        let defaults = Self::default();

        let port = match var("PORT").or_else(|| var("KITH_API_PORT")) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| {
                ApiError::internal_error(format!("Invalid port value: {}", raw))
            })?,
            None => defaults.port,
        };

        let cors_origins = var("KITH_CORS_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            bind_host: var("KITH_API_BIND").unwrap_or(defaults.bind_host),
            port,
            cors_origins,
            cors_allow_credentials: var("KITH_CORS_ALLOW_CREDENTIALS")
                .map(|s| s.to_lowercase() == "true")
                .unwrap_or(false),
            cors_max_age_secs: var("KITH_CORS_MAX_AGE_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.cors_max_age_secs),
            environment: var("KITH_ENVIRONMENT")
                .map(|e| Environment::parse(&e))
                .unwrap_or_default(),
            auto_migrate: var("KITH_AUTO_MIGRATE")
                .map(|s| matches!(s.to_lowercase().as_str(), "true" | "1" | "yes"))
                .unwrap_or(false),
        })
    }

    pub fn bind_addr(&self) -> ApiResult<SocketAddr> {
        let addr = format!("{}:{}", self.bind_host, self.port);
        addr.parse::<SocketAddr>().map_err(|e| {
            ApiError::internal_error(format!("Invalid bind address {}: {}", addr, e))
        })
    }

    /// Reject settings that are only acceptable in development.
    pub fn validate_for_production(&self) -> ApiResult<()> {
        if self.environment.is_production() && self.cors_origins.is_empty() {
            return Err(ApiError::internal_error(
                "CORS origins not configured for production. Set KITH_CORS_ORIGINS.",
            ));
        }
        Ok(())
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.cors_origins.is_empty() {
            return true;
        }

        self.cors_origins.iter().any(|allowed| {
            if allowed == origin {
                return true;
            }
            if let Some(domain) = allowed.strip_prefix("*.") {
                if let Some(host) = origin.strip_prefix("https://") {
                    return host.ends_with(&format!(".{}", domain));
                }
            }
            false
        })
    }
}
