//! Current user routes.

use axum::{extract::State, routing::{get, patch}, Json, Router};
use kith_core::{PreferencesPatch, User};

use crate::error::ApiResult;
use crate::extractors::ValidatedJson;
use crate::middleware::AuthExtractor;
use crate::services::UserService;
use crate::state::AppState;

/// GET /api/me
pub async fn get_me(
    State(users): State<UserService>,
    AuthExtractor(auth): AuthExtractor,
) -> ApiResult<Json<User>> {
    let owner = users.owner(&auth).await?;
    Ok(Json(users.me(&owner).await?))
}

/// PATCH /api/me/preferences - `{"defaultPageSize": 50}` or `null` to clear.
pub async fn update_preferences(
    State(users): State<UserService>,
    AuthExtractor(auth): AuthExtractor,
    ValidatedJson(patch): ValidatedJson<PreferencesPatch>,
) -> ApiResult<Json<User>> {
    let owner = users.owner(&auth).await?;
    Ok(Json(users.update_preferences(&owner, patch).await?))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_me))
        .route("/preferences", patch(update_preferences))
}
