//! Kith API Server Entry Point
//!
//! Loads configuration, optionally applies pending migrations and serves
//! the router until Ctrl-C.

use kith_api::telemetry::{init_logging, LoggingConfig};
use kith_api::{create_api_router, ApiConfig, ApiError, ApiResult, AppState, AuthConfig, DbClient, DbConfig, SchemaMigrator};

#[tokio::main]
async fn main() -> ApiResult<()> {
    dotenvy::dotenv().ok();
    init_logging(&LoggingConfig::from_env())?;

    let api_config = ApiConfig::from_env()?;
    let auth_config = AuthConfig::from_env();
    auth_config.validate_for_environment(api_config.environment)?;
    api_config.validate_for_production()?;

    let db_config = DbConfig::from_env();
    let db = DbClient::from_config(&db_config)?;

    if api_config.auto_migrate {
        let applied = SchemaMigrator::connect(&db_config).await?.up().await?;
        tracing::info!(?applied, "Startup migrations finished");
    }

    let addr = api_config.bind_addr()?;
    let environment = api_config.environment;
    let app = create_api_router(AppState::new(db, api_config, auth_config));

    tracing::info!(%addr, ?environment, "Starting Kith API server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
