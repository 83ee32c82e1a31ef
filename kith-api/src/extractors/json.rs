//! JSON body extractors.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use kith_core::{Valid, Validate};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// `Json<T>` whose rejection is 400 `INVALID_BODY` in the API error shape.
///
/// Covers a missing content type, malformed JSON, wrong field types and
/// unknown fields.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::invalid_body(rejection.body_text())),
        }
    }
}

/// A parsed body that also passed its validator.
///
/// Rejects with `INVALID_BODY` when the JSON does not fit `T`, then with
/// `VALIDATION_FAILED` listing every failing field.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub Valid<T>);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let ApiJson(value) = ApiJson::<T>::from_request(req, state).await?;
        let valid = value.validate()?;
        Ok(ValidatedJson(valid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, routing::post, Router};
    use kith_core::CircleInput;
    use tower::ServiceExt;

    fn router() -> Router {
        Router::new().route(
            "/circles",
            post(|ValidatedJson(input): ValidatedJson<CircleInput>| async move {
                input.into_inner().name
            }),
        )
    }

    async fn post_json(body: &str) -> (StatusCode, serde_json::Value) {
        let response = router()
            .oneshot(
                Request::post("/circles")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (
            status,
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null),
        )
    }

    #[tokio::test]
    async fn test_valid_body() {
        let (status, _) = post_json(r##"{"name":"Climbing","color":"#ff8800"}"##).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_malformed_json() {
        let (status, body) = post_json(r#"{"name":"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_BODY");
    }

    #[tokio::test]
    async fn test_unknown_field_is_invalid_body() {
        let (status, body) = post_json(r#"{"name":"x","colour":"red"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_BODY");
    }

    #[tokio::test]
    async fn test_validation_reports_all_fields() {
        let (status, body) = post_json(r#"{"name":"  ","color":"red"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_FAILED");
        let fields: Vec<&str> = body["details"]["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["field"].as_str().unwrap())
            .collect();
        assert_eq!(fields, vec!["name", "color"]);
    }
}
