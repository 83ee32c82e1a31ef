//! Raw query-string extractor.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use kith_core::QueryParams;

use crate::error::ApiError;

/// Percent-decoded query pairs in request order, repeated keys kept.
///
/// A query string that is not valid `application/x-www-form-urlencoded`
/// is a `VALIDATION_FAILED` on the `query` field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPairs(pub QueryParams);

#[async_trait]
impl<St> FromRequestParts<St> for QueryPairs
where
    St: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        let raw = parts.uri.query().unwrap_or_default();
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(raw)
            .map_err(|e| ApiError::invalid_field("query", format!("malformed query string: {}", e)))?;
        Ok(QueryPairs(QueryParams::from_pairs(pairs)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Request;

    async fn extract(uri: &str) -> Result<QueryPairs, ApiError> {
        let (mut parts, _) = Request::get(uri).body(()).unwrap().into_parts();
        QueryPairs::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_decodes_in_order() {
        let QueryPairs(params) = extract("/x?q=caf%C3%A9+au&tag=a&tag=b").await.unwrap();
        assert_eq!(params.first("q"), Some("café au"));
        assert_eq!(params.all("tag"), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_missing_query_is_empty() {
        let QueryPairs(params) = extract("/x").await.unwrap();
        assert!(params.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced() {
        let QueryPairs(params) = extract("/x?q=ab%FF").await.unwrap();
        assert_eq!(params.first("q"), Some("ab\u{FFFD}"));
    }
}
