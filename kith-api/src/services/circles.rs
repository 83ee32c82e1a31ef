//! Circles: named, colored groupings of friends.

use kith_core::schema::normalize;
use kith_core::{Circle, CircleId, CircleInput, CirclePatch, EntityIdType, FriendId, Valid};
use tokio_postgres::{GenericClient, Row};

use super::friends::{resolve_circle, resolve_friend};
use super::{ext_id, ext_ids, Owner};
use crate::db::DbClient;
use crate::error::{ApiError, ApiResult};
use crate::sql::UpdateSql;

/// Members are live friends only.
const CIRCLE_COLUMNS: &str = "\
ci.external_id, ci.name, ci.color, ci.description, ci.created_at, ci.updated_at, \
ARRAY(SELECT f.external_id FROM friends.circle_members cm \
      JOIN friends.friends f ON f.id = cm.friend_id \
      JOIN contacts.contacts c ON c.id = f.contact_id \
      WHERE cm.circle_id = ci.id AND f.deleted_at IS NULL \
      ORDER BY lower(c.display_name), f.id) AS member_ids";

#[derive(Clone)]
pub struct CircleService {
    db: DbClient,
}

impl CircleService {
    pub fn new(db: DbClient) -> Self {
        Self { db }
    }

    /// Every circle of `owner`, by name. Circles are few, so this is not paged.
    pub async fn list(&self, owner: &Owner) -> ApiResult<Vec<Circle>> {
        let conn = self.db.get_conn().await?;
        let rows = conn
            .query(
                format!(
                    "SELECT {CIRCLE_COLUMNS} FROM friends.circles ci \
                     WHERE ci.owner_id = $1 ORDER BY lower(ci.name), ci.id"
                )
                .as_str(),
                &[&owner.id],
            )
            .await?;
        rows.iter().map(circle_from_row).collect()
    }

    pub async fn get(&self, owner: &Owner, id: CircleId) -> ApiResult<Circle> {
        let conn = self.db.get_conn().await?;
        load(&**conn, owner, id).await
    }

    pub async fn create(&self, owner: &Owner, input: Valid<CircleInput>) -> ApiResult<Circle> {
        let id = CircleId::now_v7();
        let conn = self.db.get_conn().await?;
        conn.execute(
            "INSERT INTO friends.circles (external_id, owner_id, name, color, description) \
             VALUES ($1, $2, $3, $4, $5)",
            &[
                &id.as_uuid(),
                &owner.id,
                &input.name.trim(),
                &normalize(input.color.as_deref()),
                &normalize(input.description.as_deref()),
            ],
        )
        .await?;

        tracing::debug!(circle_id = %id, "Created circle");
        load(&**conn, owner, id).await
    }

    pub async fn update(&self, owner: &Owner, id: CircleId, patch: Valid<CirclePatch>) -> ApiResult<Circle> {
        let patch = patch.into_inner();
        let conn = self.db.get_conn().await?;
        let row_id = resolve_circle(&**conn, owner, id).await?;

        let mut update = UpdateSql::new("friends.circles");
        update
            .set_opt("name", patch.name.as_deref().map(|n| n.trim().to_string()))
            .set_opt("color", patch.color.as_ref().map(|v| normalize(v.as_deref())))
            .set_opt("description", patch.description.as_ref().map(|v| normalize(v.as_deref())));
        if let Some((sql, params)) = update.build(row_id) {
            conn.execute(sql.as_str(), &params.as_refs()).await?;
        }

        load(&**conn, owner, id).await
    }

    /// Hard delete; memberships go with it.
    pub async fn delete(&self, owner: &Owner, id: CircleId) -> ApiResult<()> {
        let conn = self.db.get_conn().await?;
        let deleted = conn
            .execute(
                "DELETE FROM friends.circles WHERE owner_id = $1 AND external_id = $2",
                &[&owner.id, &id.as_uuid()],
            )
            .await?;
        if deleted == 0 {
            return Err(ApiError::not_found("circle"));
        }
        tracing::debug!(circle_id = %id, "Deleted circle");
        Ok(())
    }

    /// Idempotent: adding a member twice is not an error.
    pub async fn add_member(&self, owner: &Owner, id: CircleId, friend: FriendId) -> ApiResult<Circle> {
        let conn = self.db.get_conn().await?;
        let circle_row = resolve_circle(&**conn, owner, id).await?;
        let friend_row = resolve_friend(&**conn, owner, friend).await?;

        let added = conn
            .execute(
                "INSERT INTO friends.circle_members (circle_id, friend_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
                &[&circle_row, &friend_row],
            )
            .await?;
        if added > 0 {
            touch(&**conn, circle_row).await?;
        }

        load(&**conn, owner, id).await
    }

    /// 404 when the friend is not in the circle.
    pub async fn remove_member(&self, owner: &Owner, id: CircleId, friend: FriendId) -> ApiResult<Circle> {
        let conn = self.db.get_conn().await?;
        let circle_row = resolve_circle(&**conn, owner, id).await?;
        let friend_row = resolve_friend(&**conn, owner, friend).await?;

        let removed = conn
            .execute(
                "DELETE FROM friends.circle_members WHERE circle_id = $1 AND friend_id = $2",
                &[&circle_row, &friend_row],
            )
            .await?;
        if removed == 0 {
            return Err(ApiError::not_found("circle member"));
        }
        touch(&**conn, circle_row).await?;

        load(&**conn, owner, id).await
    }
}

async fn touch<C: GenericClient + Sync>(client: &C, circle_row: i64) -> ApiResult<()> {
    client
        .execute("UPDATE friends.circles SET updated_at = now() WHERE id = $1", &[&circle_row])
        .await?;
    Ok(())
}

async fn load<C: GenericClient + Sync>(client: &C, owner: &Owner, id: CircleId) -> ApiResult<Circle> {
    let row = client
        .query_opt(
            format!(
                "SELECT {CIRCLE_COLUMNS} FROM friends.circles ci \
                 WHERE ci.owner_id = $1 AND ci.external_id = $2"
            )
            .as_str(),
            &[&owner.id, &id.as_uuid()],
        )
        .await?
        .ok_or_else(|| ApiError::not_found("circle"))?;
    circle_from_row(&row)
}

fn circle_from_row(row: &Row) -> ApiResult<Circle> {
    let member_ids: Vec<FriendId> = ext_ids(row, "member_ids")?;
    Ok(Circle {
        id: ext_id(row, "external_id")?,
        name: row.try_get("name")?,
        color: row.try_get("color")?,
        description: row.try_get("description")?,
        member_count: member_ids.len() as i64,
        member_ids,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_members_exclude_deleted_friends() {
        assert!(CIRCLE_COLUMNS.contains("f.deleted_at IS NULL"));
        assert!(CIRCLE_COLUMNS.contains("AS member_ids"));
    }
}
