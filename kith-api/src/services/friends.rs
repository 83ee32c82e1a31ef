//! Friends: contacts the user keeps in touch with.

use kith_core::schema::normalize;
use kith_core::{
    CircleId, EntityIdType, Friend, FriendId, FriendInput, FriendListQuery, FriendPatch,
    FriendSort, Page, Valid,
};
use tokio_postgres::{GenericClient, Row};

use super::contacts::{insert_contact, lock_contact, summary_from_row, CONTACT_SUMMARY_COLUMNS};
use super::{ext_id, ext_ids, Owner};
use crate::db::DbClient;
use crate::error::{ApiError, ApiResult};
use crate::sql::{fetch_page, ListSql, SearchField, UpdateSql};

const FROM: &str = "friends.friends f JOIN contacts.contacts c ON c.id = f.contact_id";

/// Most recent encounter day of `f`.
const LAST_ENCOUNTER: &str = "(SELECT max(e.occurred_on) FROM friends.encounter_friends ef \
JOIN friends.encounters e ON e.id = ef.encounter_id WHERE ef.friend_id = f.id)";

fn friend_columns() -> String {
    format!(
        "f.id, f.external_id, f.is_self, f.favorite, f.archived, f.met_on, f.met_context, \
         f.notes, f.created_at, f.updated_at, {CONTACT_SUMMARY_COLUMNS}, \
         ARRAY(SELECT ci.external_id FROM friends.circle_members cm \
               JOIN friends.circles ci ON ci.id = cm.circle_id \
               WHERE cm.friend_id = f.id ORDER BY lower(ci.name), ci.id) AS circle_ids, \
         {LAST_ENCOUNTER} AS last_encounter_on"
    )
}

const SEARCH_FIELDS: &[SearchField<'static>] = &[
    SearchField::Column("c.display_name"),
    SearchField::Column("c.given_name"),
    SearchField::Column("c.family_name"),
    SearchField::Column("c.nickname"),
];

fn sort_column(sort: FriendSort) -> &'static str {
    match sort {
        FriendSort::Name => "lower(c.display_name)",
        FriendSort::CreatedAt => "f.created_at",
        FriendSort::LastEncounter => LAST_ENCOUNTER,
        FriendSort::MetOn => "f.met_on",
    }
}

/// Live friends of `owner_id` matching every facet. Repeated circles are
/// AND-combined.
fn list_sql(owner_id: i64, query: &FriendListQuery) -> ListSql {
    let facets = query.facets();
    let mut list = ListSql::owned_by(FROM, "f", owner_id);
    list.and("f.deleted_at IS NULL");
    for circle in &facets.circles {
        let p = list.param(circle.as_uuid());
        list.and(format!(
            "EXISTS (SELECT 1 FROM friends.circle_members cm \
             JOIN friends.circles ci ON ci.id = cm.circle_id \
             WHERE cm.friend_id = f.id AND ci.external_id = {p})"
        ));
    }
    if let Some(collective) = facets.collective {
        let p = list.param(collective.as_uuid());
        list.and(format!(
            "EXISTS (SELECT 1 FROM friends.collective_memberships m \
             JOIN friends.collectives co ON co.id = m.collective_id \
             WHERE m.friend_id = f.id AND co.external_id = {p})"
        ));
    }
    list.and_flag(facets.favorite, "f.favorite")
        .and_flag(facets.archived, "f.archived")
        .and_flag(facets.is_self, "f.is_self")
        .search(query.search(), SEARCH_FIELDS);
    list
}

#[derive(Clone)]
pub struct FriendService {
    db: DbClient,
}

impl FriendService {
    pub fn new(db: DbClient) -> Self {
        Self { db }
    }

    pub async fn list(&self, owner: &Owner, query: FriendListQuery) -> ApiResult<Page<Friend>> {
        let query = query.with_preferred_page_size(owner.preferred_page_size);
        let list = list_sql(owner.id, &query);
        let sql = list.page_sql(
            &friend_columns(),
            sort_column(query.sort()),
            query.direction(),
            query.pagination(),
        );
        let mut conn = self.db.get_conn().await?;
        fetch_page(&mut conn, &list, &sql, query.pagination(), friend_from_row).await
    }

    pub async fn get(&self, owner: &Owner, id: FriendId) -> ApiResult<Friend> {
        let conn = self.db.get_conn().await?;
        load(&**conn, owner, id).await
    }

    /// 404 unless `id` is a live friend of `owner`.
    pub async fn ensure_exists(&self, owner: &Owner, id: FriendId) -> ApiResult<()> {
        let conn = self.db.get_conn().await?;
        resolve_friend(&**conn, owner, id).await.map(|_| ())
    }

    /// Create from an existing contact or an inline one, then join circles.
    ///
    /// A second live friend for the same contact is a 409 and leaves the
    /// existing friend untouched.
    pub async fn create(&self, owner: &Owner, input: Valid<FriendInput>) -> ApiResult<Friend> {
        let input = input.into_inner();
        let mut conn = self.db.get_conn().await?;
        let tx = conn.transaction().await?;

        let contact_row = match (&input.contact_id, &input.contact) {
            (Some(contact_id), _) => lock_contact(&*tx, owner, *contact_id).await?,
            (None, Some(contact)) => insert_contact(&*tx, owner, contact).await?.0,
            (None, None) => return Err(ApiError::invalid_field("contactId", "contactId or contact is required")),
        };

        let id = FriendId::now_v7();
        let row = tx
            .query_one(
                "INSERT INTO friends.friends \
                 (external_id, owner_id, contact_id, is_self, favorite, archived, met_on, met_context, notes) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING id",
                &[
                    &id.as_uuid(),
                    &owner.id,
                    &contact_row,
                    &input.is_self,
                    &input.favorite,
                    &input.archived,
                    &input.met_on,
                    &normalize(input.met_context.as_deref()),
                    &normalize(input.notes.as_deref()),
                ],
            )
            .await?;
        let friend_row: i64 = row.try_get("id")?;

        for circle in &input.circle_ids {
            let circle_row = resolve_circle(&*tx, owner, *circle).await?;
            tx.execute(
                "INSERT INTO friends.circle_members (circle_id, friend_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
                &[&circle_row, &friend_row],
            )
            .await?;
        }
        tx.commit().await?;

        tracing::debug!(friend_id = %id, "Created friend");
        load(&**conn, owner, id).await
    }

    pub async fn update(&self, owner: &Owner, id: FriendId, patch: Valid<FriendPatch>) -> ApiResult<Friend> {
        let patch = patch.into_inner();
        let conn = self.db.get_conn().await?;
        let row_id = resolve_friend(&**conn, owner, id).await?;

        let mut update = UpdateSql::new("friends.friends");
        update
            .set_opt("is_self", patch.is_self)
            .set_opt("favorite", patch.favorite)
            .set_opt("archived", patch.archived)
            .set_opt("met_on", patch.met_on)
            .set_opt("met_context", patch.met_context.as_ref().map(|v| normalize(v.as_deref())))
            .set_opt("notes", patch.notes.as_ref().map(|v| normalize(v.as_deref())));
        if let Some((sql, params)) = update.build(row_id) {
            conn.execute(sql.as_str(), &params.as_refs()).await?;
        }

        load(&**conn, owner, id).await
    }

    /// Soft delete. Circle and collective rows stay but are hidden with the friend.
    pub async fn delete(&self, owner: &Owner, id: FriendId) -> ApiResult<()> {
        let conn = self.db.get_conn().await?;
        let deleted = conn
            .execute(
                "UPDATE friends.friends SET deleted_at = now(), updated_at = now() \
                 WHERE owner_id = $1 AND external_id = $2 AND deleted_at IS NULL",
                &[&owner.id, &id.as_uuid()],
            )
            .await?;
        if deleted == 0 {
            return Err(ApiError::not_found("friend"));
        }
        tracing::debug!(friend_id = %id, "Deleted friend");
        Ok(())
    }
}

// ============================================================================
// LOOKUPS SHARED WITH OTHER SERVICES
// ============================================================================

/// Internal id of a live friend owned by `owner`.
pub(crate) async fn resolve_friend<C: GenericClient + Sync>(
    client: &C,
    owner: &Owner,
    id: FriendId,
) -> ApiResult<i64> {
    let row = client
        .query_opt(
            "SELECT id FROM friends.friends \
             WHERE owner_id = $1 AND external_id = $2 AND deleted_at IS NULL",
            &[&owner.id, &id.as_uuid()],
        )
        .await?
        .ok_or_else(|| ApiError::not_found("friend"))?;
    Ok(row.try_get("id")?)
}

/// Internal id of a circle owned by `owner`.
pub(crate) async fn resolve_circle<C: GenericClient + Sync>(
    client: &C,
    owner: &Owner,
    id: CircleId,
) -> ApiResult<i64> {
    let row = client
        .query_opt(
            "SELECT id FROM friends.circles WHERE owner_id = $1 AND external_id = $2",
            &[&owner.id, &id.as_uuid()],
        )
        .await?
        .ok_or_else(|| ApiError::not_found("circle"))?;
    Ok(row.try_get("id")?)
}

async fn load<C: GenericClient + Sync>(client: &C, owner: &Owner, id: FriendId) -> ApiResult<Friend> {
    let sql = format!(
        "SELECT {} FROM {FROM} \
         WHERE f.owner_id = $1 AND f.external_id = $2 AND f.deleted_at IS NULL",
        friend_columns()
    );
    let row = client
        .query_opt(sql.as_str(), &[&owner.id, &id.as_uuid()])
        .await?
        .ok_or_else(|| ApiError::not_found("friend"))?;
    friend_from_row(&row)
}

fn friend_from_row(row: &Row) -> ApiResult<Friend> {
    Ok(Friend {
        id: ext_id(row, "external_id")?,
        contact: summary_from_row(row)?,
        is_self: row.try_get("is_self")?,
        favorite: row.try_get("favorite")?,
        archived: row.try_get("archived")?,
        met_on: row.try_get("met_on")?,
        met_context: row.try_get("met_context")?,
        notes: row.try_get("notes")?,
        circle_ids: ext_ids(row, "circle_ids")?,
        last_encounter_on: row.try_get("last_encounter_on")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
