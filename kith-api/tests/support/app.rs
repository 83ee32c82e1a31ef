use axum::Router;
use kith_api::auth::JwtSecret;
use kith_api::{create_api_router, generate_jwt_token, ApiConfig, AppState, AuthConfig, DbClient, DbConfig};
use kith_core::{EntityIdType, UserId};

pub const TEST_SECRET: &str = "router-test-secret-with-enough-length";

pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: JwtSecret::new(TEST_SECRET.to_string()).expect("test secret"),
        ..AuthConfig::default()
    }
}

pub fn test_api_config(cors_origins: &[&str]) -> ApiConfig {
    let origins = cors_origins.join(",");
    ApiConfig::from_lookup(|key| match key {
        "KITH_CORS_ORIGINS" if !origins.is_empty() => Some(origins.clone()),
        _ => None,
    })
    .expect("test api config")
}

/// Router over a pool that never connects unless a handler asks for a connection.
pub fn test_app(cors_origins: &[&str]) -> Router {
    let db = DbClient::from_config(&DbConfig::default()).expect("lazy pool");
    create_api_router(AppState::new(db, test_api_config(cors_origins), test_auth_config()))
}

pub fn bearer() -> String {
    let token = generate_jwt_token(&test_auth_config(), UserId::now_v7(), None).expect("token");
    format!("Bearer {}", token)
}
