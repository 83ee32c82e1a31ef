//! Kith API - REST Server, Services and Migrations
//!
//! Axum routes over a deadpool-postgres pool. Requests are authenticated by
//! a bearer JWT, resolved to an owner row, and handed to a per-aggregate
//! service that scopes every statement to that owner.
//!
//! - [`routes`]: HTTP surface and router assembly
//! - [`services`]: owner-scoped reads and writes
//! - [`sql`]: list/count and partial-update statement builders
//! - [`migrations`]: embedded schema migrations run by sqlx

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
mod macros;
pub mod middleware;
pub mod migrations;
pub mod reporting;
pub mod routes;
pub mod services;
pub mod sql;
pub mod state;
pub mod telemetry;

pub use auth::{authenticate, generate_jwt_token, validate_jwt_token, AuthConfig, AuthContext, Claims};
pub use config::{ApiConfig, Environment};
pub use db::{DbClient, DbConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use middleware::{auth_middleware, AuthExtractor, AuthMiddlewareState};
pub use migrations::SchemaMigrator;
pub use routes::create_api_router;
pub use state::AppState;
