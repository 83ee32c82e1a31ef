//! Postgres pool.
//!
//! The pool opens no connection until the first query, so routers can be
//! built and exercised without a reachable database.

use crate::error::{ApiError, ApiResult};
use deadpool_postgres::{
    Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime, Timeouts,
};
use std::time::Duration;
use tokio_postgres::NoTls;

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Full connection string; takes precedence over the discrete fields.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Wait/create/recycle timeout
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            dbname: "kith".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// `DATABASE_URL` wins over `KITH_DB_HOST` / `KITH_DB_PORT` /
    /// `KITH_DB_NAME` / `KITH_DB_USER` / `KITH_DB_PASSWORD`.
    /// `KITH_DB_POOL_SIZE` and `KITH_DB_TIMEOUT` (seconds) apply either way.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unparseable numbers keep their defaults.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let text = |key: &str, fallback: String| var(key).filter(|v| !v.trim().is_empty()).unwrap_or(fallback);

        Self {
            url: var("DATABASE_URL").filter(|v| !v.trim().is_empty()),
            host: text("KITH_DB_HOST", defaults.host),
            port: var("KITH_DB_PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.port),
            dbname: text("KITH_DB_NAME", defaults.dbname),
            user: text("KITH_DB_USER", defaults.user),
            password: var("KITH_DB_PASSWORD").unwrap_or(defaults.password),
            max_size: var("KITH_DB_POOL_SIZE")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.max_size),
            timeout: var("KITH_DB_TIMEOUT")
                .and_then(|v| v.trim().parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    fn pool_config(&self) -> Config {
        let mut cfg = Config::new();
        match &self.url {
            Some(url) => cfg.url = Some(url.clone()),
            None => {
                cfg.host = Some(self.host.clone());
                cfg.port = Some(self.port);
                cfg.dbname = Some(self.dbname.clone());
                cfg.user = Some(self.user.clone());
                cfg.password = Some(self.password.clone());
            }
        }

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool = PoolConfig::new(self.max_size.max(1));
        pool.timeouts = Timeouts {
            wait: Some(self.timeout),
            create: Some(self.timeout),
            recycle: Some(self.timeout),
        };
        cfg.pool = Some(pool);
        cfg
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        self.pool_config()
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::internal_error(format!("Failed to create pool: {}", e)))
    }
}

// ============================================================================
// DATABASE CLIENT WRAPPER
// ============================================================================

/// Cloneable handle over the connection pool.
#[derive(Clone)]
pub struct DbClient {
    pool: Pool,
}

impl DbClient {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool))
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    /// Get a connection from the pool.
    pub async fn get_conn(&self) -> ApiResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(ApiError::from)
    }

    /// Round-trip a trivial query.
    pub async fn health_check(&self) -> ApiResult<()> {
        let conn = self.get_conn().await?;
        conn.query_one("SELECT 1", &[]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DbConfig::default();
        assert_eq!(config.port, 5432);
        assert_eq!(config.dbname, "kith");
        assert!(config.url.is_none());
    }

    #[test]
    fn test_lookup_reads_discrete_fields() {
        let config = DbConfig::from_lookup(|key| match key {
            "KITH_DB_HOST" => Some("db.internal".to_string()),
            "KITH_DB_PORT" => Some("6432".to_string()),
            "KITH_DB_POOL_SIZE" => Some("many".to_string()),
            "DATABASE_URL" => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 6432);
        assert_eq!(config.max_size, 16);
        assert!(config.url.is_none());
    }

    #[test]
    fn test_url_takes_precedence() {
        let config = DbConfig {
            url: Some("postgres://kith@db:5433/kith_test".to_string()),
            ..Default::default()
        };
        let cfg = config.pool_config();
        assert_eq!(cfg.url.as_deref(), Some("postgres://kith@db:5433/kith_test"));
        assert!(cfg.host.is_none());
    }

    #[test]
    fn test_pool_limits_applied() {
        let config = DbConfig {
            max_size: 4,
            timeout: Duration::from_secs(5),
            ..Default::default()
        };
        let pool = config.pool_config().pool.unwrap();
        assert_eq!(pool.max_size, 4);
        assert_eq!(pool.timeouts.wait, Some(Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn test_pool_is_lazy() {
        let db = DbClient::from_config(&DbConfig::default()).unwrap();
        assert_eq!(db.pool_size(), 0);
    }
}
