//! Collective and membership REST routes.

use axum::{extract::State, http::StatusCode, routing::{get, patch, post}, Json, Router};
use kith_core::{
    Collective, CollectiveDetail, CollectiveFacets, CollectiveId, CollectiveInput,
    CollectivePatch, CollectiveSort, Membership, MembershipId, MembershipInput, MembershipPatch,
    Page,
};

use crate::error::ApiResult;
use crate::extractors::{ListParams, PathId, PathIds, ValidatedJson};
use crate::middleware::AuthExtractor;
use crate::services::{CollectiveService, UserService};
use crate::state::AppState;

/// GET /api/collectives
pub async fn list_collectives(
    State(users): State<UserService>,
    State(collectives): State<CollectiveService>,
    AuthExtractor(auth): AuthExtractor,
    ListParams(query): ListParams<CollectiveSort, CollectiveFacets>,
) -> ApiResult<Json<Page<Collective>>> {
    let owner = users.owner(&auth).await?;
    Ok(Json(collectives.list(&owner, query).await?))
}

/// POST /api/collectives - optionally with initial memberships.
pub async fn create_collective(
    State(users): State<UserService>,
    State(collectives): State<CollectiveService>,
    AuthExtractor(auth): AuthExtractor,
    ValidatedJson(input): ValidatedJson<CollectiveInput>,
) -> ApiResult<(StatusCode, Json<CollectiveDetail>)> {
    let owner = users.owner(&auth).await?;
    let collective = collectives.create(&owner, input).await?;
    Ok((StatusCode::CREATED, Json(collective)))
}

/// GET /api/collectives/:id
pub async fn get_collective(
    State(users): State<UserService>,
    State(collectives): State<CollectiveService>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<CollectiveId>,
) -> ApiResult<Json<CollectiveDetail>> {
    let owner = users.owner(&auth).await?;
    Ok(Json(collectives.get(&owner, id).await?))
}

/// PATCH /api/collectives/:id
pub async fn update_collective(
    State(users): State<UserService>,
    State(collectives): State<CollectiveService>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<CollectiveId>,
    ValidatedJson(patch): ValidatedJson<CollectivePatch>,
) -> ApiResult<Json<CollectiveDetail>> {
    let owner = users.owner(&auth).await?;
    Ok(Json(collectives.update(&owner, id, patch).await?))
}

/// DELETE /api/collectives/:id
pub async fn delete_collective(
    State(users): State<UserService>,
    State(collectives): State<CollectiveService>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<CollectiveId>,
) -> ApiResult<StatusCode> {
    let owner = users.owner(&auth).await?;
    collectives.delete(&owner, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/collectives/:id/memberships
pub async fn add_membership(
    State(users): State<UserService>,
    State(collectives): State<CollectiveService>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<CollectiveId>,
    ValidatedJson(input): ValidatedJson<MembershipInput>,
) -> ApiResult<(StatusCode, Json<Membership>)> {
    let owner = users.owner(&auth).await?;
    let membership = collectives.add_membership(&owner, id, input).await?;
    Ok((StatusCode::CREATED, Json(membership)))
}

/// PATCH /api/collectives/:id/memberships/:mid
pub async fn update_membership(
    State(users): State<UserService>,
    State(collectives): State<CollectiveService>,
    AuthExtractor(auth): AuthExtractor,
    PathIds((id, membership_id)): PathIds<(CollectiveId, MembershipId)>,
    ValidatedJson(patch): ValidatedJson<MembershipPatch>,
) -> ApiResult<Json<Membership>> {
    let owner = users.owner(&auth).await?;
    Ok(Json(collectives.update_membership(&owner, id, membership_id, patch).await?))
}

/// DELETE /api/collectives/:id/memberships/:mid
pub async fn delete_membership(
    State(users): State<UserService>,
    State(collectives): State<CollectiveService>,
    AuthExtractor(auth): AuthExtractor,
    PathIds((id, membership_id)): PathIds<(CollectiveId, MembershipId)>,
) -> ApiResult<StatusCode> {
    let owner = users.owner(&auth).await?;
    collectives.delete_membership(&owner, id, membership_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_collectives).post(create_collective))
        .route(
            "/:id",
            get(get_collective).patch(update_collective).delete(delete_collective),
        )
        .route("/:id/memberships", post(add_membership))
        .route(
            "/:id/memberships/:mid",
            patch(update_membership).delete(delete_membership),
        )
}
