//! Typed path-id extractors.
//!
//! `PathId<T>` turns the route's single path parameter into an
//! [`EntityIdType`] newtype. Anything that is not a UUID is rejected with
//! 400 `INVALID_ID` before the handler body runs.

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use kith_core::{parse_id, EntityIdType};

use crate::error::ApiError;

/// Single typed id from the path.
///
/// ```rust,ignore
/// async fn get_friend(PathId(friend_id): PathId<FriendId>) -> ApiResult<Json<Friend>> {
///     // friend_id is FriendId, not Uuid
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PathId<T: EntityIdType>(pub T);

/// Two typed ids from the path, in route order.
///
/// ```rust,ignore
/// // For route: /circles/:id/members/:friend_id
/// async fn add_member(
///     PathIds((circle_id, friend_id)): PathIds<(CircleId, FriendId)>,
/// ) -> ApiResult<StatusCode> {
///     // ...
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PathIds<T>(pub T);

async fn raw_params<S: Send + Sync>(
    parts: &mut Parts,
    state: &S,
    expected: usize,
) -> Result<Vec<String>, ApiError> {
    let Path(params): Path<Vec<(String, String)>> = Path::from_request_parts(parts, state)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to read path parameters: {}", e)))?;

    if params.len() != expected {
        return Err(ApiError::internal_error(format!(
            "Route {} has {} path parameters, expected {}",
            parts.uri.path(),
            params.len(),
            expected
        )));
    }
    Ok(params.into_iter().map(|(_, value)| value).collect())
}

fn parse<T: EntityIdType>(raw: &str) -> Result<T, ApiError> {
    parse_id::<T>(raw).map_err(|_| ApiError::invalid_id(&format!("{} id", T::ENTITY_NAME), raw))
}

#[async_trait]
impl<S, T> FromRequestParts<S> for PathId<T>
where
    S: Send + Sync,
    T: EntityIdType,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let raw = raw_params(parts, state, 1).await?;
        Ok(PathId(parse(&raw[0])?))
    }
}

#[async_trait]
impl<S, T1, T2> FromRequestParts<S> for PathIds<(T1, T2)>
where
    S: Send + Sync,
    T1: EntityIdType,
    T2: EntityIdType,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let raw = raw_params(parts, state, 2).await?;
        Ok(PathIds((parse(&raw[0])?, parse(&raw[1])?)))
    }
}
