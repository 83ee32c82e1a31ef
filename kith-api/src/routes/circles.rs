//! Circle REST routes.

use axum::{extract::State, http::StatusCode, routing::{get, put}, Json, Router};
use kith_core::{Circle, CircleId, CircleInput, CirclePatch, FriendId};

use crate::error::ApiResult;
use crate::extractors::{PathId, PathIds, ValidatedJson};
use crate::middleware::AuthExtractor;
use crate::services::{CircleService, UserService};
use crate::state::AppState;

/// GET /api/circles - every circle, unpaged.
pub async fn list_circles(
    State(users): State<UserService>,
    State(circles): State<CircleService>,
    AuthExtractor(auth): AuthExtractor,
) -> ApiResult<Json<Vec<Circle>>> {
    let owner = users.owner(&auth).await?;
    Ok(Json(circles.list(&owner).await?))
}

/// POST /api/circles
pub async fn create_circle(
    State(users): State<UserService>,
    State(circles): State<CircleService>,
    AuthExtractor(auth): AuthExtractor,
    ValidatedJson(input): ValidatedJson<CircleInput>,
) -> ApiResult<(StatusCode, Json<Circle>)> {
    let owner = users.owner(&auth).await?;
    let circle = circles.create(&owner, input).await?;
    Ok((StatusCode::CREATED, Json(circle)))
}

/// GET /api/circles/:id
pub async fn get_circle(
    State(users): State<UserService>,
    State(circles): State<CircleService>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<CircleId>,
) -> ApiResult<Json<Circle>> {
    let owner = users.owner(&auth).await?;
    Ok(Json(circles.get(&owner, id).await?))
}

/// PATCH /api/circles/:id
pub async fn update_circle(
    State(users): State<UserService>,
    State(circles): State<CircleService>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<CircleId>,
    ValidatedJson(patch): ValidatedJson<CirclePatch>,
) -> ApiResult<Json<Circle>> {
    let owner = users.owner(&auth).await?;
    Ok(Json(circles.update(&owner, id, patch).await?))
}

/// DELETE /api/circles/:id
pub async fn delete_circle(
    State(users): State<UserService>,
    State(circles): State<CircleService>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<CircleId>,
) -> ApiResult<StatusCode> {
    let owner = users.owner(&auth).await?;
    circles.delete(&owner, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/circles/:id/members/:friend_id
pub async fn add_member(
    State(users): State<UserService>,
    State(circles): State<CircleService>,
    AuthExtractor(auth): AuthExtractor,
    PathIds((id, friend_id)): PathIds<(CircleId, FriendId)>,
) -> ApiResult<Json<Circle>> {
    let owner = users.owner(&auth).await?;
    Ok(Json(circles.add_member(&owner, id, friend_id).await?))
}

/// DELETE /api/circles/:id/members/:friend_id
pub async fn remove_member(
    State(users): State<UserService>,
    State(circles): State<CircleService>,
    AuthExtractor(auth): AuthExtractor,
    PathIds((id, friend_id)): PathIds<(CircleId, FriendId)>,
) -> ApiResult<Json<Circle>> {
    let owner = users.owner(&auth).await?;
    Ok(Json(circles.remove_member(&owner, id, friend_id).await?))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_circles).post(create_circle))
        .route(
            "/:id",
            get(get_circle).patch(update_circle).delete(delete_circle),
        )
        .route("/:id/members/:friend_id", put(add_member).delete(remove_member))
}
