//! Contact REST routes.

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use kith_core::{
    Contact, ContactFacets, ContactId, ContactInput, ContactPatch, ContactSort, ContactSummary,
    Page,
};

use crate::error::ApiResult;
use crate::extractors::{ListParams, PathId, ValidatedJson};
use crate::middleware::AuthExtractor;
use crate::services::{ContactService, UserService};
use crate::state::AppState;

/// GET /api/contacts
pub async fn list_contacts(
    State(users): State<UserService>,
    State(contacts): State<ContactService>,
    AuthExtractor(auth): AuthExtractor,
    ListParams(query): ListParams<ContactSort, ContactFacets>,
) -> ApiResult<Json<Page<ContactSummary>>> {
    let owner = users.owner(&auth).await?;
    Ok(Json(contacts.list(&owner, query).await?))
}

/// POST /api/contacts
pub async fn create_contact(
    State(users): State<UserService>,
    State(contacts): State<ContactService>,
    AuthExtractor(auth): AuthExtractor,
    ValidatedJson(input): ValidatedJson<ContactInput>,
) -> ApiResult<(StatusCode, Json<Contact>)> {
    let owner = users.owner(&auth).await?;
    let contact = contacts.create(&owner, input).await?;
    Ok((StatusCode::CREATED, Json(contact)))
}

/// GET /api/contacts/:id
pub async fn get_contact(
    State(users): State<UserService>,
    State(contacts): State<ContactService>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<ContactId>,
) -> ApiResult<Json<Contact>> {
    let owner = users.owner(&auth).await?;
    Ok(Json(contacts.get(&owner, id).await?))
}

/// PATCH /api/contacts/:id - detail lists present in the body replace the stored ones.
pub async fn update_contact(
    State(users): State<UserService>,
    State(contacts): State<ContactService>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<ContactId>,
    ValidatedJson(patch): ValidatedJson<ContactPatch>,
) -> ApiResult<Json<Contact>> {
    let owner = users.owner(&auth).await?;
    Ok(Json(contacts.update(&owner, id, patch).await?))
}

/// DELETE /api/contacts/:id - 409 while a live friend is backed by it.
pub async fn delete_contact(
    State(users): State<UserService>,
    State(contacts): State<ContactService>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<ContactId>,
) -> ApiResult<StatusCode> {
    let owner = users.owner(&auth).await?;
    contacts.delete(&owner, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_contacts).post(create_contact))
        .route(
            "/:id",
            get(get_contact).patch(update_contact).delete(delete_contact),
        )
}
