//! Axum Middleware for Authentication
//!
//! - Validates the bearer token on every `/api` request
//! - Injects [`AuthContext`] into request extensions
//! - Returns 401 for missing, malformed, expired or foreign-signed tokens
//!
//! The middleware never touches the database. Resolving the caller to an
//! owner row (and checking the session) happens in the handlers, after
//! path, query and body extraction.

use crate::auth::{authenticate, AuthConfig, AuthContext};
use crate::error::ApiError;
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

// ============================================================================
// MIDDLEWARE STATE
// ============================================================================

#[derive(Debug, Clone)]
pub struct AuthMiddlewareState {
    pub auth_config: Arc<AuthConfig>,
}

impl AuthMiddlewareState {
    pub fn new(auth_config: AuthConfig) -> Self {
        Self {
            auth_config: Arc::new(auth_config),
        }
    }
}

// ============================================================================
// MIDDLEWARE FUNCTION
// ============================================================================

/// Authenticate the request and stash the [`AuthContext`] for handlers.
///
/// ```ignore
/// use axum::{middleware, Router};
/// use kith_api::middleware::{auth_middleware, AuthMiddlewareState};
/// use kith_api::AuthConfig;
///
/// let auth_state = AuthMiddlewareState::new(AuthConfig::from_env());
/// let app = Router::new()
///     .route("/api/me", axum::routing::get(|| async { "OK" }))
///     .layer(middleware::from_fn_with_state(auth_state, auth_middleware));
/// ```
pub async fn auth_middleware(
    State(state): State<AuthMiddlewareState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let auth_context = authenticate(&state.auth_config, auth_header)?;
    tracing::Span::current().record("user_id", tracing::field::display(auth_context.user_id));

    request.extensions_mut().insert(auth_context);
    Ok(next.run(request).await)
}

// ============================================================================
// TYPED EXTRACTOR
// ============================================================================

/// Handler argument proving the request went through [`auth_middleware`].
///
/// Rejects with 500 if the middleware is missing from the route.
#[derive(Debug, Clone)]
pub struct AuthExtractor(pub AuthContext);

#[async_trait]
impl<S> FromRequestParts<S> for AuthExtractor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(AuthExtractor)
            .ok_or_else(|| {
                ApiError::internal_error(
                    "AuthContext not found in request extensions. \
                     Ensure auth_middleware is applied to this route.",
                )
            })
    }
}

impl std::ops::Deref for AuthExtractor {
    type Target = AuthContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{generate_jwt_token, JwtSecret};
    use axum::{body::Body, http::StatusCode, middleware::from_fn_with_state, routing::get, Router};
    use kith_core::{EntityIdType, UserId};
    use tower::ServiceExt;

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: JwtSecret::new("middleware-test-secret".to_string()).unwrap(),
            ..AuthConfig::default()
        }
    }

    fn app(config: AuthConfig) -> Router {
        Router::new()
            .route(
                "/whoami",
                get(|AuthExtractor(auth): AuthExtractor| async move { auth.user_id.to_string() }),
            )
            .layer(from_fn_with_state(AuthMiddlewareState::new(config), auth_middleware))
    }

    #[tokio::test]
    async fn test_rejects_missing_header() {
        let response = app(config())
            .oneshot(Request::get("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_injects_context() {
        let config = config();
        let user = UserId::now_v7();
        let token = generate_jwt_token(&config, user, None).unwrap();

        let response = app(config)
            .oneshot(
                Request::get("/whoami")
                    .header(AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(bytes, user.to_string().as_bytes());
    }

    #[tokio::test]
    async fn test_extractor_without_middleware_is_internal_error() {
        let router = Router::new().route(
            "/whoami",
            get(|AuthExtractor(_): AuthExtractor| async { "unreachable" }),
        );
        let response = router
            .oneshot(Request::get("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
