//! Friend REST routes.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use kith_core::{
    Encounter, EncounterFacets, EncounterSort, Friend, FriendFacets, FriendId, FriendInput,
    FriendPatch, FriendSort, Page,
};

use crate::error::ApiResult;
use crate::extractors::{ListParams, PathId, ValidatedJson};
use crate::middleware::AuthExtractor;
use crate::services::{EncounterService, FriendService, UserService};
use crate::state::AppState;

/// GET /api/friends
pub async fn list_friends(
    State(users): State<UserService>,
    State(friends): State<FriendService>,
    AuthExtractor(auth): AuthExtractor,
    ListParams(query): ListParams<FriendSort, FriendFacets>,
) -> ApiResult<Json<Page<Friend>>> {
    let owner = users.owner(&auth).await?;
    Ok(Json(friends.list(&owner, query).await?))
}

/// POST /api/friends - from `contactId` or an inline `contact`.
pub async fn create_friend(
    State(users): State<UserService>,
    State(friends): State<FriendService>,
    AuthExtractor(auth): AuthExtractor,
    ValidatedJson(input): ValidatedJson<FriendInput>,
) -> ApiResult<(StatusCode, Json<Friend>)> {
    let owner = users.owner(&auth).await?;
    let friend = friends.create(&owner, input).await?;
    Ok((StatusCode::CREATED, Json(friend)))
}

/// GET /api/friends/:id
pub async fn get_friend(
    State(users): State<UserService>,
    State(friends): State<FriendService>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<FriendId>,
) -> ApiResult<Json<Friend>> {
    let owner = users.owner(&auth).await?;
    Ok(Json(friends.get(&owner, id).await?))
}

/// PATCH /api/friends/:id
pub async fn update_friend(
    State(users): State<UserService>,
    State(friends): State<FriendService>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<FriendId>,
    ValidatedJson(patch): ValidatedJson<FriendPatch>,
) -> ApiResult<Json<Friend>> {
    let owner = users.owner(&auth).await?;
    Ok(Json(friends.update(&owner, id, patch).await?))
}

/// DELETE /api/friends/:id
pub async fn delete_friend(
    State(users): State<UserService>,
    State(friends): State<FriendService>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<FriendId>,
) -> ApiResult<StatusCode> {
    let owner = users.owner(&auth).await?;
    friends.delete(&owner, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/friends/:id/encounters - the encounter list, restricted to this friend.
pub async fn list_friend_encounters(
    State(users): State<UserService>,
    State(friends): State<FriendService>,
    State(encounters): State<EncounterService>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<FriendId>,
    ListParams(query): ListParams<EncounterSort, EncounterFacets>,
) -> ApiResult<Json<Page<Encounter>>> {
    let owner = users.owner(&auth).await?;
    friends.ensure_exists(&owner, id).await?;
    Ok(Json(encounters.list(&owner, query.for_friend(id)).await?))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_friends).post(create_friend))
        .route(
            "/:id",
            get(get_friend).patch(update_friend).delete(delete_friend),
        )
        .route("/:id/encounters", get(list_friend_encounters))
}
