//! Probes, no authentication:
//! - `/health/ping`: constant `pong`
//! - `/health/live`: the process is serving requests
//! - `/health/ready`: the database answers and its schema is current

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::db::DbClient;
use crate::migrations::{latest_version, schema_version};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Liveness {
    pub status: ProbeStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Readiness {
    pub status: ProbeStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub database: DatabaseProbe,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseProbe {
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    pub pool_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<i64>,
    pub expected_schema_version: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DatabaseProbe {
    fn is_ready(&self) -> bool {
        self.reachable && self.schema_version == Some(self.expected_schema_version)
    }
}

pub async fn ping() -> &'static str {
    "pong"
}

pub async fn liveness() -> Json<Liveness> {
    Json(Liveness {
        status: ProbeStatus::Healthy,
    })
}

/// 503 until the database answers with every migration applied.
pub async fn readiness(
    State(db): State<DbClient>,
    State(start_time): State<Instant>,
) -> impl IntoResponse {
    let database = probe_database(&db).await;
    let (code, status) = if database.is_ready() {
        (StatusCode::OK, ProbeStatus::Healthy)
    } else {
        tracing::warn!(error = ?database.error, schema_version = ?database.schema_version, "Readiness probe failed");
        (StatusCode::SERVICE_UNAVAILABLE, ProbeStatus::Unhealthy)
    };

    let body = Readiness {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: start_time.elapsed().as_secs(),
        database,
    };
    (code, Json(body))
}

async fn probe_database(db: &DbClient) -> DatabaseProbe {
    let mut probe = DatabaseProbe {
        pool_size: db.pool_size(),
        expected_schema_version: latest_version(),
        ..Default::default()
    };

    let started = Instant::now();
    if let Err(e) = db.health_check().await {
        probe.error = Some(e.message);
        return probe;
    }
    probe.reachable = true;
    probe.latency_ms = Some(started.elapsed().as_millis() as u64);

    match schema_version(db).await {
        Ok(version) => probe.schema_version = Some(version),
        Err(e) => probe.error = Some(e.message),
    }
    probe
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}
