//! Caller resolution and the `/me` profile.

use kith_core::{EntityIdType, Preferences, PreferencesPatch, User, UserId, Valid};
use tokio_postgres::Row;
use uuid::Uuid;

use super::{ext_id, page_size_from_db, Owner};
use crate::auth::AuthContext;
use crate::db::DbClient;
use crate::error::{ApiError, ApiResult};

const RESOLVE_OWNER: &str = "\
SELECT u.id, u.default_page_size, u.disabled_at IS NOT NULL AS disabled,
       ($2::uuid IS NULL OR EXISTS (
           SELECT 1 FROM auth.sessions s
           WHERE s.user_id = u.id
             AND s.external_id = $2
             AND s.revoked_at IS NULL
             AND s.expires_at > now()
       )) AS session_ok
FROM auth.users u
WHERE u.external_id = $1";

const USER_COLUMNS: &str = "external_id, email, display_name, default_page_size, created_at";

/// Session check first: a dead session is 401 even on a disabled account.
fn admit(session_ok: bool, disabled: bool) -> ApiResult<()> {
    if !session_ok {
        return Err(ApiError::unauthorized("Session is revoked or expired"));
    }
    if disabled {
        return Err(ApiError::forbidden("Account is disabled"));
    }
    Ok(())
}

#[derive(Clone)]
pub struct UserService {
    db: DbClient,
}

impl UserService {
    pub fn new(db: DbClient) -> Self {
        Self { db }
    }

    /// Map the token's subject to an owner row.
    ///
    /// Unknown users and revoked or expired sessions are 401, the same as a
    /// bad token. A disabled account is 403.
    pub async fn owner(&self, auth: &AuthContext) -> ApiResult<Owner> {
        let conn = self.db.get_conn().await?;
        let session: Option<Uuid> = auth.session_id.map(|s| s.as_uuid());
        let row = conn
            .query_opt(RESOLVE_OWNER, &[&auth.user_id.as_uuid(), &session])
            .await?
            .ok_or_else(|| ApiError::unauthorized("Unknown user"))?;

        if let Err(e) = admit(row.try_get("session_ok")?, row.try_get("disabled")?) {
            tracing::debug!(user_id = %auth.user_id, code = e.code.as_str(), "Rejected caller");
            return Err(e);
        }

        Ok(Owner {
            id: row.try_get("id")?,
            user_id: auth.user_id,
            preferred_page_size: page_size_from_db(row.try_get("default_page_size")?),
        })
    }

    pub async fn me(&self, owner: &Owner) -> ApiResult<User> {
        let conn = self.db.get_conn().await?;
        let row = conn
            .query_opt(
                format!("SELECT {USER_COLUMNS} FROM auth.users WHERE id = $1").as_str(),
                &[&owner.id],
            )
            .await?
            .ok_or_else(|| ApiError::not_found("user"))?;
        user_from_row(&row)
    }

    /// Set or clear the default page size.
    pub async fn update_preferences(
        &self,
        owner: &Owner,
        patch: Valid<PreferencesPatch>,
    ) -> ApiResult<User> {
        let Some(page_size) = patch.page_size() else {
            return self.me(owner).await;
        };
        let stored: Option<i16> = page_size.map(|size| size.get() as i16);

        let conn = self.db.get_conn().await?;
        let row = conn
            .query_opt(
                format!(
                    "UPDATE auth.users SET default_page_size = $2, updated_at = now() \
                     WHERE id = $1 RETURNING {USER_COLUMNS}"
                )
                .as_str(),
                &[&owner.id, &stored],
            )
            .await?
            .ok_or_else(|| ApiError::not_found("user"))?;

        tracing::debug!(user_id = %owner.user_id, default_page_size = ?stored, "Updated preferences");
        user_from_row(&row)
    }
}

fn user_from_row(row: &Row) -> ApiResult<User> {
    Ok(User {
        id: ext_id::<UserId>(row, "external_id")?,
        email: row.try_get("email")?,
        display_name: row.try_get("display_name")?,
        preferences: Preferences {
            default_page_size: page_size_from_db(row.try_get("default_page_size")?),
        },
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_admit() {
        assert!(admit(true, false).is_ok());
        assert_eq!(admit(false, false).unwrap_err().code, ErrorCode::Unauthorized);
        assert_eq!(admit(false, true).unwrap_err().code, ErrorCode::Unauthorized);

        let err = admit(true, true).unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
    }
}
