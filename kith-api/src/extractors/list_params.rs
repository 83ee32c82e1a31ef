//! List query-string extractor.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use kith_core::query::Facets;
use kith_core::{ListQuery, SortField};

use super::QueryPairs;
use crate::error::ApiError;

/// Parsed `ListQuery<S, F>` for one entity's list route.
///
/// The query string is decoded by [`QueryPairs`] and handed to the core
/// parser. Every malformed key is reported in one
/// `VALIDATION_FAILED` response; the database is never touched on failure.
#[derive(Debug, Clone)]
pub struct ListParams<S, F>(pub ListQuery<S, F>);

#[async_trait]
impl<St, S, F> FromRequestParts<St> for ListParams<S, F>
where
    St: Send + Sync,
    S: SortField + Send,
    F: Facets + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &St) -> Result<Self, Self::Rejection> {
        let QueryPairs(params) = QueryPairs::from_request_parts(parts, state).await?;
        Ok(ListParams(ListQuery::<S, F>::parse(&params)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Request;
    use kith_core::{FriendFacets, FriendSort, PageSize, SortDirection};

    async fn extract(uri: &str) -> Result<ListParams<FriendSort, FriendFacets>, ApiError> {
        let (mut parts, _) = Request::get(uri).body(()).unwrap().into_parts();
        ListParams::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_defaults() {
        let ListParams(query) = extract("/friends").await.unwrap();
        assert_eq!(query.sort(), FriendSort::Name);
        assert_eq!(query.direction(), SortDirection::Asc);
        assert_eq!(query.page(), 1);
        assert_eq!(query.page_size(), PageSize::TwentyFive);
    }

    #[tokio::test]
    async fn test_decodes_and_keeps_repeats() {
        let a = uuid::Uuid::now_v7();
        let b = uuid::Uuid::now_v7();
        let ListParams(query) = extract(&format!(
            "/friends?search=ada%20l&circle={a}&circle={b}&sort=metOn&pageSize=999"
        ))
        .await
        .unwrap();
        assert_eq!(query.search().unwrap().as_str(), "ada l");
        assert_eq!(query.facets().circles.len(), 2);
        assert_eq!(query.sort(), FriendSort::MetOn);
        assert_eq!(query.page_size(), PageSize::TwentyFive);
    }

    #[tokio::test]
    async fn test_errors_are_validation_failed() {
        let err = extract("/friends?page=0&sortDir=up&favorite=maybe")
            .await
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ValidationFailed);
        let fields = err.details.unwrap()["fields"].as_array().unwrap().len();
        assert_eq!(fields, 3);
    }
}
