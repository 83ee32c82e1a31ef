//! REST API Routes
//!
//! One module per resource. Everything under `/api` passes the bearer-token
//! middleware; `/health/*` and `/metrics` are public.

pub mod address_lookup;
pub mod circles;
pub mod collectives;
pub mod contacts;
pub mod encounters;
pub mod friends;
pub mod health;
pub mod me;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, request::Parts, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::ApiConfig;
use crate::middleware::{auth_middleware, AuthMiddlewareState};
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

/// Authenticated resource routes, relative to `/api`.
fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/me", me::create_router())
        .nest("/contacts", contacts::create_router())
        .nest("/friends", friends::create_router())
        .nest("/circles", circles::create_router())
        .nest("/collectives", collectives::create_router())
        .nest("/encounters", encounters::create_router())
        .nest("/address-lookup", address_lookup::create_router())
}

/// Build the complete router.
///
/// # Middleware Order (outer to inner)
/// 1. CORS - answers preflight requests
/// 2. Observability - span, metrics, completion log
/// 3. Auth (only on `/api/*`) - validates the bearer token
pub fn create_api_router(state: AppState) -> Router {
    let auth_state = AuthMiddlewareState {
        auth_config: state.auth_config.clone(),
    };
    let cors = build_cors_layer(state.api_config.clone());

    let api = api_routes().layer(from_fn_with_state(auth_state, auth_middleware));

    Router::new()
        .nest("/api", api)
        .nest("/health", health::create_router())
        .route("/metrics", get(metrics_handler))
        .with_state(state)
        .layer(from_fn(observability_middleware))
        .layer(cors)
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Without configured origins every origin is allowed (development only;
/// production startup refuses an empty list).
fn build_cors_layer(config: Arc<ApiConfig>) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: allowing all origins");
    } else {
        tracing::info!(origins = ?config.cors_origins, "CORS: restricting origins");
    }

    let allow_credentials = config.cors_allow_credentials && !config.cors_origins.is_empty();
    let cors = cors.allow_origin(AllowOrigin::predicate(
        move |origin: &HeaderValue, _parts: &Parts| {
            origin
                .to_str()
                .map(|o| config.is_origin_allowed(o))
                .unwrap_or(false)
        },
    ));

    if allow_credentials {
        cors.allow_credentials(true)
    } else {
        cors
    }
}
