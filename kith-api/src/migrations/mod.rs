//! Embedded schema migrations.
//!
//! Scripts live in `kith-api/migrations` as reversible
//! `NNNN_name.up.sql` / `NNNN_name.down.sql` pairs and are compiled in by
//! `sqlx::migrate!`. sqlx records applied versions with their checksums in
//! `_sqlx_migrations`, refuses to run when an applied script changed, and
//! holds an advisory lock while it works.

use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

use crate::db::{DbClient, DbConfig};
use crate::error::{ApiError, ApiResult};

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const APPLIED_SQL: &str =
    "SELECT version, installed_on FROM _sqlx_migrations WHERE success ORDER BY version";

/// `true` once sqlx has created its history table.
const HISTORY_EXISTS_SQL: &str = "SELECT to_regclass('_sqlx_migrations') IS NOT NULL";

/// Newest embedded version.
pub fn latest_version() -> i64 {
    MIGRATOR
        .iter()
        .filter(|m| m.migration_type.is_up_migration())
        .map(|m| m.version)
        .max()
        .unwrap_or(0)
}

/// A successful row of `_sqlx_migrations`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMigration {
    pub version: i64,
    pub installed_on: DateTime<Utc>,
}

/// One line of `kith-migrate status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub version: i64,
    pub description: String,
    pub installed_on: Option<DateTime<Utc>>,
}

pub fn status_of(applied: &[AppliedMigration]) -> Vec<MigrationStatus> {
    MIGRATOR
        .iter()
        .filter(|m| m.migration_type.is_up_migration())
        .map(|m| MigrationStatus {
            version: m.version,
            description: m.description.to_string(),
            installed_on: applied
                .iter()
                .find(|a| a.version == m.version)
                .map(|a| a.installed_on),
        })
        .collect()
}

/// Target for `undo` that reverts the newest `steps` of `applied`
/// (ascending), and the versions that reverts, newest first.
pub fn undo_plan(applied: &[i64], steps: usize) -> (i64, Vec<i64>) {
    let keep = applied.len().saturating_sub(steps);
    let target = keep.checked_sub(1).map(|i| applied[i]).unwrap_or(0);
    let reverted = applied[keep..].iter().rev().copied().collect();
    (target, reverted)
}

/// Highest applied version read over the request pool; 0 before the first
/// run.
pub async fn schema_version(db: &DbClient) -> ApiResult<i64> {
    let conn = db.get_conn().await?;
    let exists: bool = conn.query_one(HISTORY_EXISTS_SQL, &[]).await?.try_get(0)?;
    if !exists {
        return Ok(0);
    }
    let rows = conn.query(APPLIED_SQL, &[]).await?;
    let mut version = 0;
    for row in rows {
        version = version.max(row.try_get::<_, i64>("version")?);
    }
    Ok(version)
}

fn connect_options(config: &DbConfig) -> ApiResult<PgConnectOptions> {
    match &config.url {
        Some(url) => url
            .parse()
            .map_err(|e| ApiError::internal_error(format!("Invalid DATABASE_URL: {}", e))),
        None => Ok(PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.dbname)
            .username(&config.user)
            .password(&config.password)),
    }
}

/// Runs [`MIGRATOR`] over its own single-connection sqlx pool.
pub struct SchemaMigrator {
    pool: PgPool,
}

impl SchemaMigrator {
    pub async fn connect(config: &DbConfig) -> ApiResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(config.timeout)
            .connect_with(connect_options(config)?)
            .await?;
        Ok(Self { pool })
    }

    async fn applied(&self) -> ApiResult<Vec<AppliedMigration>> {
        let exists: bool = sqlx::query_scalar(HISTORY_EXISTS_SQL)
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Ok(Vec::new());
        }
        let rows: Vec<(i64, DateTime<Utc>)> = sqlx::query_as(APPLIED_SQL)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(version, installed_on)| AppliedMigration { version, installed_on })
            .collect())
    }

    async fn applied_versions(&self) -> ApiResult<Vec<i64>> {
        Ok(self.applied().await?.into_iter().map(|a| a.version).collect())
    }

    pub async fn status(&self) -> ApiResult<Vec<MigrationStatus>> {
        Ok(status_of(&self.applied().await?))
    }

    /// Apply every pending migration. Returns the versions applied.
    pub async fn up(&self) -> ApiResult<Vec<i64>> {
        let before = self.applied_versions().await?;
        MIGRATOR.run(&self.pool).await?;
        let applied: Vec<i64> = self
            .applied_versions()
            .await?
            .into_iter()
            .filter(|v| !before.contains(v))
            .collect();

        if applied.is_empty() {
            tracing::info!("Schema is up to date");
        } else {
            tracing::info!(?applied, "Applied migrations");
        }
        Ok(applied)
    }

    /// Revert the newest `steps` migrations. Returns the versions reverted.
    pub async fn down(&self, steps: usize) -> ApiResult<Vec<i64>> {
        let (target, reverted) = undo_plan(&self.applied_versions().await?, steps);
        if !reverted.is_empty() {
            tracing::info!(?reverted, target, "Reverting migrations");
            MIGRATOR.undo(&self.pool, target).await?;
        }
        Ok(reverted)
    }
}
