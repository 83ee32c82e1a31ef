//! Encounters: dated meetings with one or more friends.

use kith_core::schema::normalize;
use kith_core::{
    Encounter, EncounterId, EncounterInput, EncounterListQuery, EncounterPatch, EncounterSort,
    EntityIdType, FriendId, Page, Valid,
};
use tokio_postgres::{GenericClient, Row};

use super::friends::resolve_friend;
use super::{ext_id, ext_ids, Owner};
use crate::db::DbClient;
use crate::error::{ApiError, ApiResult};
use crate::sql::{fetch_page, ListSql, SearchField, UpdateSql};

const ENCOUNTER_COLUMNS: &str = "\
e.external_id, e.occurred_on, e.title, e.description, e.location, e.created_at, e.updated_at, \
ARRAY(SELECT f.external_id FROM friends.encounter_friends ef \
      JOIN friends.friends f ON f.id = ef.friend_id \
      WHERE ef.encounter_id = e.id AND f.deleted_at IS NULL ORDER BY f.id) AS friend_ids";

const SEARCH_FIELDS: &[SearchField<'static>] = &[
    SearchField::Column("e.title"),
    SearchField::Column("e.description"),
    SearchField::Column("e.location"),
];

fn sort_column(sort: EncounterSort) -> &'static str {
    match sort {
        EncounterSort::OccurredOn => "e.occurred_on",
        EncounterSort::CreatedAt => "e.created_at",
        EncounterSort::Title => "lower(e.title)",
    }
}

/// Encounters of `owner_id` that include every listed live friend and fall
/// inside the inclusive date bounds.
fn list_sql(owner_id: i64, query: &EncounterListQuery) -> ListSql {
    let facets = query.facets();
    let mut list = ListSql::owned_by("friends.encounters e", "e", owner_id);
    for friend in &facets.friends {
        let p = list.param(friend.as_uuid());
        list.and(format!(
            "EXISTS (SELECT 1 FROM friends.encounter_friends ef \
             JOIN friends.friends f ON f.id = ef.friend_id \
             WHERE ef.encounter_id = e.id AND f.deleted_at IS NULL AND f.external_id = {p})"
        ));
    }
    if let Some(from) = facets.from {
        let p = list.param(from);
        list.and(format!("e.occurred_on >= {p}"));
    }
    if let Some(to) = facets.to {
        let p = list.param(to);
        list.and(format!("e.occurred_on <= {p}"));
    }
    list.search(query.search(), SEARCH_FIELDS);
    list
}

#[derive(Clone)]
pub struct EncounterService {
    db: DbClient,
}

impl EncounterService {
    pub fn new(db: DbClient) -> Self {
        Self { db }
    }

    pub async fn list(&self, owner: &Owner, query: EncounterListQuery) -> ApiResult<Page<Encounter>> {
        let query = query.with_preferred_page_size(owner.preferred_page_size);
        let list = list_sql(owner.id, &query);
        let sql = list.page_sql(
            ENCOUNTER_COLUMNS,
            sort_column(query.sort()),
            query.direction(),
            query.pagination(),
        );
        let mut conn = self.db.get_conn().await?;
        fetch_page(&mut conn, &list, &sql, query.pagination(), encounter_from_row).await
    }

    pub async fn get(&self, owner: &Owner, id: EncounterId) -> ApiResult<Encounter> {
        let conn = self.db.get_conn().await?;
        load(&**conn, owner, id).await
    }

    /// Every participant must be a live friend of `owner`.
    pub async fn create(&self, owner: &Owner, input: Valid<EncounterInput>) -> ApiResult<Encounter> {
        let id = EncounterId::now_v7();
        let mut conn = self.db.get_conn().await?;
        let tx = conn.transaction().await?;

        let row = tx
            .query_one(
                "INSERT INTO friends.encounters \
                 (external_id, owner_id, occurred_on, title, description, location) \
                 VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
                &[
                    &id.as_uuid(),
                    &owner.id,
                    &input.occurred_on,
                    &input.title.trim(),
                    &normalize(input.description.as_deref()),
                    &normalize(input.location.as_deref()),
                ],
            )
            .await?;
        let row_id: i64 = row.try_get("id")?;
        insert_participants(&*tx, owner, row_id, &input.friend_ids).await?;
        tx.commit().await?;

        tracing::debug!(encounter_id = %id, participants = input.friend_ids.len(), "Created encounter");
        load(&**conn, owner, id).await
    }

    /// Participants are replaced as a whole when `friendIds` is present.
    pub async fn update(
        &self,
        owner: &Owner,
        id: EncounterId,
        patch: Valid<EncounterPatch>,
    ) -> ApiResult<Encounter> {
        let patch = patch.into_inner();
        let mut conn = self.db.get_conn().await?;
        let tx = conn.transaction().await?;
        let row_id = resolve_encounter(&*tx, owner, id).await?;

        let mut update = UpdateSql::new("friends.encounters");
        update
            .set_opt("occurred_on", patch.occurred_on)
            .set_opt("title", patch.title.as_deref().map(|t| t.trim().to_string()))
            .set_opt("description", patch.description.as_ref().map(|v| normalize(v.as_deref())))
            .set_opt("location", patch.location.as_ref().map(|v| normalize(v.as_deref())));
        let touched = !update.is_empty();
        if let Some((sql, params)) = update.build(row_id) {
            tx.execute(sql.as_str(), &params.as_refs()).await?;
        }

        if let Some(friend_ids) = &patch.friend_ids {
            tx.execute(
                "DELETE FROM friends.encounter_friends WHERE encounter_id = $1",
                &[&row_id],
            )
            .await?;
            insert_participants(&*tx, owner, row_id, friend_ids).await?;
            if !touched {
                tx.execute(
                    "UPDATE friends.encounters SET updated_at = now() WHERE id = $1",
                    &[&row_id],
                )
                .await?;
            }
        }
        tx.commit().await?;

        load(&**conn, owner, id).await
    }

    pub async fn delete(&self, owner: &Owner, id: EncounterId) -> ApiResult<()> {
        let conn = self.db.get_conn().await?;
        let deleted = conn
            .execute(
                "DELETE FROM friends.encounters WHERE owner_id = $1 AND external_id = $2",
                &[&owner.id, &id.as_uuid()],
            )
            .await?;
        if deleted == 0 {
            return Err(ApiError::not_found("encounter"));
        }
        tracing::debug!(encounter_id = %id, "Deleted encounter");
        Ok(())
    }
}

async fn resolve_encounter<C: GenericClient + Sync>(
    client: &C,
    owner: &Owner,
    id: EncounterId,
) -> ApiResult<i64> {
    let row = client
        .query_opt(
            "SELECT id FROM friends.encounters WHERE owner_id = $1 AND external_id = $2 FOR UPDATE",
            &[&owner.id, &id.as_uuid()],
        )
        .await?
        .ok_or_else(|| ApiError::not_found("encounter"))?;
    Ok(row.try_get("id")?)
}

async fn insert_participants<C: GenericClient + Sync>(
    client: &C,
    owner: &Owner,
    encounter_row: i64,
    friends: &[FriendId],
) -> ApiResult<()> {
    for friend in friends {
        let friend_row = resolve_friend(client, owner, *friend).await?;
        client
            .execute(
                "INSERT INTO friends.encounter_friends (encounter_id, friend_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
                &[&encounter_row, &friend_row],
            )
            .await?;
    }
    Ok(())
}

async fn load<C: GenericClient + Sync>(client: &C, owner: &Owner, id: EncounterId) -> ApiResult<Encounter> {
    let row = client
        .query_opt(
            format!(
                "SELECT {ENCOUNTER_COLUMNS} FROM friends.encounters e \
                 WHERE e.owner_id = $1 AND e.external_id = $2"
            )
            .as_str(),
            &[&owner.id, &id.as_uuid()],
        )
        .await?
        .ok_or_else(|| ApiError::not_found("encounter"))?;
    encounter_from_row(&row)
}

fn encounter_from_row(row: &Row) -> ApiResult<Encounter> {
    Ok(Encounter {
        id: ext_id(row, "external_id")?,
        occurred_on: row.try_get("occurred_on")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        location: row.try_get("location")?,
        friend_ids: ext_ids(row, "friend_ids")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
