//! Authentication Module
//!
//! Bearer JWT validation for the Kith API. Tokens are issued by the external
//! session service; this module only verifies them. The `sub` claim carries
//! the user's external id and the optional `sid` claim names the session the
//! token belongs to, which is checked against `auth.sessions` when the owner
//! is resolved.

use crate::config::Environment;
use crate::error::{ApiError, ApiResult};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use kith_core::{EntityIdType, SessionId, UserId};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

const INSECURE_DEFAULT_SECRET: &str = "INSECURE_DEFAULT_SECRET_CHANGE_IN_PRODUCTION";
const MIN_SECRET_LEN: usize = 32;

// ============================================================================
// CLOCK ABSTRACTION
// ============================================================================

/// Clock used for `exp` / `nbf` checks.
///
/// Time validation is done here rather than inside `jsonwebtoken` so tests
/// can pin the clock.
pub trait JwtClock: Send + Sync {
    /// Current time as Unix epoch seconds; negative means the host clock is broken.
    fn now_epoch_secs(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl JwtClock for SystemClock {
    fn now_epoch_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Fixed clock for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl JwtClock for FixedClock {
    fn now_epoch_secs(&self) -> i64 {
        self.0
    }
}


// ============================================================================
// JWT SECRET
// ============================================================================

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SecretError {
    #[error("JWT secret must not be empty")]
    Empty,
}

/// JWT signing secret that never appears in logs.
#[derive(Clone)]
pub struct JwtSecret(SecretString);

impl JwtSecret {
    pub fn new(secret: String) -> Result<Self, SecretError> {
        if secret.is_empty() {
            return Err(SecretError::Empty);
        }
        Ok(Self(SecretString::new(secret.into())))
    }

    /// Expose the secret value (only for cryptographic operations).
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn len(&self) -> usize {
        self.0.expose_secret().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }

    pub fn is_insecure_default(&self) -> bool {
        self.0.expose_secret() == INSECURE_DEFAULT_SECRET
    }
}

impl std::fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JwtSecret([REDACTED, {} chars])", self.len())
    }
}

fn build_jwt_secret(secret_str: Option<String>) -> JwtSecret {
    secret_str
        .filter(|s| !s.trim().is_empty())
        .and_then(|s| JwtSecret::new(s).ok())
        .unwrap_or_else(|| JwtSecret(SecretString::new(INSECURE_DEFAULT_SECRET.into())))
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: JwtSecret,

    /// JWT algorithm (default: HS256)
    pub jwt_algorithm: Algorithm,

    /// Lifetime of tokens minted by [`generate_jwt_token`] (default: 1 hour)
    pub jwt_expiration_secs: i64,

    /// Tolerated clock drift for `exp` / `nbf` (default: 60)
    pub jwt_clock_skew_secs: i64,

    /// Required `iss` claim, when set.
    pub jwt_issuer: Option<String>,

    pub clock: Arc<dyn JwtClock>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret)
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("jwt_expiration_secs", &self.jwt_expiration_secs)
            .field("jwt_clock_skew_secs", &self.jwt_clock_skew_secs)
            .field("jwt_issuer", &self.jwt_issuer)
            .field("clock", &"<JwtClock>")
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: build_jwt_secret(None),
            jwt_algorithm: Algorithm::HS256,
            jwt_expiration_secs: 3600,
            jwt_clock_skew_secs: 60,
            jwt_issuer: None,
            clock: Arc::new(SystemClock),
        }
    }
}

impl AuthConfig {
    /// Create authentication configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `KITH_JWT_SECRET`: JWT signing secret
    /// - `KITH_JWT_EXPIRATION_SECS`: lifetime of minted tokens (default: 3600)
    /// - `KITH_JWT_CLOCK_SKEW_SECS`: clock skew tolerance (default: 60)
    /// - `KITH_JWT_ISSUER`: required issuer, if any
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            jwt_secret: build_jwt_secret(std::env::var("KITH_JWT_SECRET").ok()),
            jwt_expiration_secs: std::env::var("KITH_JWT_EXPIRATION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.jwt_expiration_secs),
            jwt_clock_skew_secs: std::env::var("KITH_JWT_CLOCK_SKEW_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.jwt_clock_skew_secs),
            jwt_issuer: std::env::var("KITH_JWT_ISSUER")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            ..defaults
        }
    }

    /// Refuse insecure secrets in production; warn about them elsewhere.
    pub fn validate_for_environment(&self, environment: Environment) -> ApiResult<()> {
        let is_production = environment.is_production();

        if self.jwt_secret.is_insecure_default() {
            if is_production {
                return Err(ApiError::internal_error(
                    "Cannot start server in production with the insecure default JWT secret. \
                     Set KITH_JWT_SECRET.",
                ));
            }
            tracing::warn!(
                "Using the insecure default JWT secret. Set KITH_JWT_SECRET before deploying."
            );
        } else if self.jwt_secret.len() < MIN_SECRET_LEN {
            if is_production {
                return Err(ApiError::internal_error(format!(
                    "JWT secret is too short for production use ({} chars, need {}).",
                    self.jwt_secret.len(),
                    MIN_SECRET_LEN
                )));
            }
            tracing::warn!(
                len = self.jwt_secret.len(),
                "JWT secret is short; use at least {} characters in production",
                MIN_SECRET_LEN
            );
        }

        Ok(())
    }
}

// ============================================================================
// JWT CLAIMS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's external id.
    pub sub: String,

    /// Session external id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,

    pub iat: i64,

    pub exp: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl Claims {
    pub fn new(
        user_id: UserId,
        session_id: Option<SessionId>,
        expiration_secs: i64,
        clock: &dyn JwtClock,
    ) -> Self {
        let now = clock.now_epoch_secs();
        Self {
            sub: user_id.to_string(),
            sid: session_id.map(|s| s.to_string()),
            iat: now,
            exp: now + expiration_secs,
            nbf: None,
            iss: None,
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.iss = Some(issuer.into());
        self
    }
}

// ============================================================================
// AUTHENTICATION CONTEXT
// ============================================================================

/// Who is calling. Inserted into request extensions by the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: UserId,
    pub session_id: Option<SessionId>,
}

impl AuthContext {
    pub fn new(user_id: UserId, session_id: Option<SessionId>) -> Self {
        Self {
            user_id,
            session_id,
        }
    }

    fn from_claims(claims: &Claims) -> ApiResult<Self> {
        let user_id = Uuid::parse_str(&claims.sub)
            .map(UserId::new)
            .map_err(|_| ApiError::invalid_token("Token subject is not a user id"))?;
        let session_id = claims
            .sid
            .as_deref()
            .map(|sid| {
                Uuid::parse_str(sid)
                    .map(SessionId::new)
                    .map_err(|_| ApiError::invalid_token("Token session id is malformed"))
            })
            .transpose()?;
        Ok(Self::new(user_id, session_id))
    }
}

// ============================================================================
// JWT VALIDATION
// ============================================================================

fn validate_claim_times(now: i64, exp: i64, nbf: Option<i64>, leeway_secs: i64) -> ApiResult<()> {
    if let Some(nbf) = nbf {
        if now + leeway_secs < nbf {
            return Err(ApiError::unauthorized("Token not yet valid (nbf)"));
        }
    }

    if exp < now - leeway_secs {
        return Err(ApiError::token_expired());
    }

    Ok(())
}

/// Verify the signature, then check times against the configured clock.
pub fn validate_jwt_token(config: &AuthConfig, token: &str) -> ApiResult<Claims> {
    let decoding_key = DecodingKey::from_secret(config.jwt_secret.expose().as_bytes());

    let mut validation = Validation::new(config.jwt_algorithm);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.required_spec_claims = std::collections::HashSet::from(["exp".to_string()]);

    let token_data =
        decode::<Claims>(token, &decoding_key, &validation).map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                ApiError::invalid_token("Token signature is invalid")
            }
            jsonwebtoken::errors::ErrorKind::MissingRequiredClaim(claim) => {
                ApiError::invalid_token(format!("Token is missing the {} claim", claim))
            }
            _ => ApiError::invalid_token("Token is invalid"),
        })?;

    let claims = token_data.claims;

    let now = config.clock.now_epoch_secs();
    if now < 0 {
        tracing::error!(timestamp = now, "System clock returned pre-epoch time");
        return Err(ApiError::internal_error("Server time configuration error"));
    }

    validate_claim_times(now, claims.exp, claims.nbf, config.jwt_clock_skew_secs)?;

    if let Some(expected) = &config.jwt_issuer {
        if claims.iss.as_deref() != Some(expected.as_str()) {
            return Err(ApiError::invalid_token("Token issuer is not accepted"));
        }
    }

    Ok(claims)
}

/// Mint a token for a user. Used by tooling and tests; production tokens
/// come from the session service.
pub fn generate_jwt_token(
    config: &AuthConfig,
    user_id: UserId,
    session_id: Option<SessionId>,
) -> ApiResult<String> {
    let mut claims = Claims::new(user_id, session_id, config.jwt_expiration_secs, &*config.clock);
    if let Some(issuer) = &config.jwt_issuer {
        claims = claims.with_issuer(issuer.clone());
    }

    let encoding_key = EncodingKey::from_secret(config.jwt_secret.expose().as_bytes());
    let header = Header::new(config.jwt_algorithm);

    encode(&header, &claims, &encoding_key)
        .map_err(|e| ApiError::internal_error(format!("Failed to generate token: {}", e)))
}

/// Authenticate from the raw `Authorization` header value.
pub fn authenticate(config: &AuthConfig, auth_header: Option<&str>) -> ApiResult<AuthContext> {
    let auth_value = auth_header.ok_or_else(|| {
        ApiError::unauthorized("Authentication required: provide an Authorization header")
    })?;

    let token = auth_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            ApiError::invalid_token("Authorization header must use the Bearer scheme")
        })?;

    let claims = validate_jwt_token(config, token)?;
    AuthContext::from_claims(&claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn test_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: JwtSecret::new("test_secret".to_string())
                .expect("Test secret should be valid"),
            clock: Arc::new(test_clocks::valid()),
            ..AuthConfig::default()
        }
    }

    #[test]
    fn test_jwt_generation_and_validation() -> ApiResult<()> {
        let config = test_config();
        let user = UserId::now_v7();
        let session = SessionId::now_v7();

        let token = generate_jwt_token(&config, user, Some(session))?;
        let ctx = authenticate(&config, Some(&format!("Bearer {}", token)))?;

        assert_eq!(ctx.user_id, user);
        assert_eq!(ctx.session_id, Some(session));
        Ok(())
    }

    #[test]
    fn test_expired_token() -> ApiResult<()> {
        let mut config = test_config();
        let token = generate_jwt_token(&config, UserId::now_v7(), None)?;

        config.clock = Arc::new(test_clocks::future());
        let err = validate_jwt_token(&config, &token).unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenExpired);
        Ok(())
    }

    #[test]
    fn test_clock_skew_is_tolerated() -> ApiResult<()> {
        let mut config = test_config();
        config.jwt_expiration_secs = 0;
        let token = generate_jwt_token(&config, UserId::now_v7(), None)?;

        config.clock = Arc::new(FixedClock(test_clocks::valid().0 + 30));
        assert!(validate_jwt_token(&config, &token).is_ok());
        Ok(())
    }

    #[test]
    fn test_wrong_secret_rejected() -> ApiResult<()> {
        let config = test_config();
        let token = generate_jwt_token(&config, UserId::now_v7(), None)?;

        let other = AuthConfig {
            jwt_secret: JwtSecret::new("another_secret".to_string()).unwrap(),
            ..test_config()
        };
        let err = validate_jwt_token(&other, &token).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidToken);
        Ok(())
    }

    #[test]
    fn test_issuer_enforced() -> ApiResult<()> {
        let mut config = test_config();
        let token = generate_jwt_token(&config, UserId::now_v7(), None)?;

        config.jwt_issuer = Some("https://auth.kith.app".to_string());
        assert!(validate_jwt_token(&config, &token).is_err());

        let token = generate_jwt_token(&config, UserId::now_v7(), None)?;
        assert!(validate_jwt_token(&config, &token).is_ok());
        Ok(())
    }

    #[test]
    fn test_missing_or_malformed_header() {
        let config = test_config();
        assert_eq!(
            authenticate(&config, None).unwrap_err().code,
            ErrorCode::Unauthorized
        );
        assert_eq!(
            authenticate(&config, Some("Basic abc")).unwrap_err().code,
            ErrorCode::InvalidToken
        );
        assert_eq!(
            authenticate(&config, Some("Bearer not.a.jwt")).unwrap_err().code,
            ErrorCode::InvalidToken
        );
    }

    #[test]
    fn test_non_uuid_subject_rejected() -> ApiResult<()> {
        let config = test_config();
        let claims = Claims {
            sub: "user-123".to_string(),
            sid: None,
            iat: test_clocks::valid().0,
            exp: test_clocks::valid().0 + 60,
            nbf: None,
            iss: None,
        };
        let token = encode(
            &Header::new(config.jwt_algorithm),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.expose().as_bytes()),
        )
        .unwrap();
        let err = authenticate(&config, Some(&format!("Bearer {}", token))).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidToken);
        Ok(())
    }

    #[test]
    fn test_production_secret_checks() {
        let insecure = AuthConfig::default();
        assert!(insecure.validate_for_environment(Environment::Production).is_err());
        assert!(insecure.validate_for_environment(Environment::Development).is_ok());

        let short = test_config();
        assert!(short.validate_for_environment(Environment::Production).is_err());

        let strong = AuthConfig {
            jwt_secret: JwtSecret::new("x".repeat(48)).unwrap(),
            ..AuthConfig::default()
        };
        assert!(strong.validate_for_environment(Environment::Production).is_ok());
    }

    #[test]
    fn test_secret_redacted_in_debug() {
        let secret = JwtSecret::new("super-secret-value".to_string()).unwrap();
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("super-secret-value"));
        assert!(debug.contains("18 chars"));
        assert_eq!(JwtSecret::new(String::new()).unwrap_err(), SecretError::Empty);
    }
}
