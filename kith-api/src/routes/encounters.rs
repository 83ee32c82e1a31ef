//! Encounter REST routes.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use kith_core::{
    Encounter, EncounterFacets, EncounterId, EncounterInput, EncounterPatch, EncounterSort, Page,
};

use crate::error::ApiResult;
use crate::extractors::{ListParams, PathId, ValidatedJson};
use crate::middleware::AuthExtractor;
use crate::services::{EncounterService, UserService};
use crate::state::AppState;

/// GET /api/encounters
pub async fn list_encounters(
    State(users): State<UserService>,
    State(encounters): State<EncounterService>,
    AuthExtractor(auth): AuthExtractor,
    ListParams(query): ListParams<EncounterSort, EncounterFacets>,
) -> ApiResult<Json<Page<Encounter>>> {
    let owner = users.owner(&auth).await?;
    Ok(Json(encounters.list(&owner, query).await?))
}

/// POST /api/encounters
pub async fn create_encounter(
    State(users): State<UserService>,
    State(encounters): State<EncounterService>,
    AuthExtractor(auth): AuthExtractor,
    ValidatedJson(input): ValidatedJson<EncounterInput>,
) -> ApiResult<(StatusCode, Json<Encounter>)> {
    let owner = users.owner(&auth).await?;
    let encounter = encounters.create(&owner, input).await?;
    Ok((StatusCode::CREATED, Json(encounter)))
}

/// GET /api/encounters/:id
pub async fn get_encounter(
    State(users): State<UserService>,
    State(encounters): State<EncounterService>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<EncounterId>,
) -> ApiResult<Json<Encounter>> {
    let owner = users.owner(&auth).await?;
    Ok(Json(encounters.get(&owner, id).await?))
}

/// PATCH /api/encounters/:id
pub async fn update_encounter(
    State(users): State<UserService>,
    State(encounters): State<EncounterService>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<EncounterId>,
    ValidatedJson(patch): ValidatedJson<EncounterPatch>,
) -> ApiResult<Json<Encounter>> {
    let owner = users.owner(&auth).await?;
    Ok(Json(encounters.update(&owner, id, patch).await?))
}

/// DELETE /api/encounters/:id
pub async fn delete_encounter(
    State(users): State<UserService>,
    State(encounters): State<EncounterService>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<EncounterId>,
) -> ApiResult<StatusCode> {
    let owner = users.owner(&auth).await?;
    encounters.delete(&owner, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_encounters).post(create_encounter))
        .route(
            "/:id",
            get(get_encounter).patch(update_encounter).delete(delete_encounter),
        )
}
