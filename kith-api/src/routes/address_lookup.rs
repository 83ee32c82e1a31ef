//! Place prefix search.

use axum::{extract::State, routing::get, Json, Router};
use kith_core::Place;

use crate::error::ApiResult;
use crate::extractors::QueryPairs;
use crate::middleware::AuthExtractor;
use crate::services::{AddressQuery, AddressService, UserService};
use crate::state::AppState;

/// GET /api/address-lookup?q=&country=&limit=
pub async fn lookup(
    State(users): State<UserService>,
    State(address): State<AddressService>,
    AuthExtractor(auth): AuthExtractor,
    QueryPairs(params): QueryPairs,
) -> ApiResult<Json<Vec<Place>>> {
    let query = AddressQuery::parse(&params)?;

    // Session revocation applies here too, even though places are not owner-scoped.
    users.owner(&auth).await?;
    Ok(Json(address.lookup(&query).await?))
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/", get(lookup))
}
