//! Collectives and their typed memberships.

use kith_core::schema::normalize;
use kith_core::{
    Collective, CollectiveDetail, CollectiveId, CollectiveInput, CollectiveKind,
    CollectiveListQuery, CollectivePatch, CollectiveSort, EntityIdType, Membership, MembershipId,
    MembershipInput, MembershipPatch, Page, Valid,
};
use tokio_postgres::{GenericClient, Row};

use super::friends::resolve_friend;
use super::{ext_id, Owner};
use crate::db::DbClient;
use crate::error::{ApiError, ApiResult};
use crate::sql::{fetch_page, ListSql, SearchField, UpdateSql};

const MEMBER_COUNT: &str = "(SELECT count(*) FROM friends.collective_memberships m \
JOIN friends.friends f ON f.id = m.friend_id \
WHERE m.collective_id = co.id AND f.deleted_at IS NULL)";

fn collective_columns() -> String {
    format!(
        "co.external_id, co.name, co.kind, co.description, co.archived, \
         co.created_at, co.updated_at, {MEMBER_COUNT} AS member_count"
    )
}

const MEMBERSHIP_COLUMNS: &str = "\
m.external_id, co.external_id AS collective_external_id, f.external_id AS friend_external_id, \
c.display_name AS friend_name, m.role, m.since, m.created_at";

const MEMBERSHIP_FROM: &str = "friends.collective_memberships m \
JOIN friends.collectives co ON co.id = m.collective_id \
JOIN friends.friends f ON f.id = m.friend_id \
JOIN contacts.contacts c ON c.id = f.contact_id";

const SEARCH_FIELDS: &[SearchField<'static>] = &[
    SearchField::Column("co.name"),
    SearchField::Column("co.description"),
];

fn sort_column(sort: CollectiveSort) -> &'static str {
    match sort {
        CollectiveSort::Name => "lower(co.name)",
        CollectiveSort::CreatedAt => "co.created_at",
        CollectiveSort::MemberCount => MEMBER_COUNT,
    }
}

/// Collectives of `owner_id` matching every facet. `member` only counts
/// live friends.
fn list_sql(owner_id: i64, query: &CollectiveListQuery) -> ListSql {
    let facets = query.facets();
    let mut list = ListSql::owned_by("friends.collectives co", "co", owner_id);
    if let Some(kind) = facets.kind {
        let p = list.param(kind.as_db_str());
        list.and(format!("co.kind = {p}"));
    }
    if let Some(member) = facets.member {
        let p = list.param(member.as_uuid());
        list.and(format!(
            "EXISTS (SELECT 1 FROM friends.collective_memberships m \
             JOIN friends.friends f ON f.id = m.friend_id \
             WHERE m.collective_id = co.id AND f.deleted_at IS NULL AND f.external_id = {p})"
        ));
    }
    list.and_flag(facets.archived, "co.archived")
        .search(query.search(), SEARCH_FIELDS);
    list
}

#[derive(Clone)]
pub struct CollectiveService {
    db: DbClient,
}

impl CollectiveService {
    pub fn new(db: DbClient) -> Self {
        Self { db }
    }

    pub async fn list(&self, owner: &Owner, query: CollectiveListQuery) -> ApiResult<Page<Collective>> {
        let query = query.with_preferred_page_size(owner.preferred_page_size);
        let list = list_sql(owner.id, &query);
        let sql = list.page_sql(
            &collective_columns(),
            sort_column(query.sort()),
            query.direction(),
            query.pagination(),
        );
        let mut conn = self.db.get_conn().await?;
        fetch_page(&mut conn, &list, &sql, query.pagination(), collective_from_row).await
    }

    pub async fn get(&self, owner: &Owner, id: CollectiveId) -> ApiResult<CollectiveDetail> {
        let conn = self.db.get_conn().await?;
        load_detail(&**conn, owner, id).await
    }

    pub async fn create(&self, owner: &Owner, input: Valid<CollectiveInput>) -> ApiResult<CollectiveDetail> {
        let input = input.into_inner();
        let id = CollectiveId::now_v7();
        let mut conn = self.db.get_conn().await?;
        let tx = conn.transaction().await?;

        let row = tx
            .query_one(
                "INSERT INTO friends.collectives (external_id, owner_id, name, kind, description, archived) \
                 VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
                &[
                    &id.as_uuid(),
                    &owner.id,
                    &input.name.trim(),
                    &input.kind.as_db_str(),
                    &normalize(input.description.as_deref()),
                    &input.archived,
                ],
            )
            .await?;
        let collective_row: i64 = row.try_get("id")?;
        for membership in &input.memberships {
            insert_membership(&*tx, owner, collective_row, membership).await?;
        }
        tx.commit().await?;

        tracing::debug!(collective_id = %id, kind = %input.kind, "Created collective");
        load_detail(&**conn, owner, id).await
    }

    pub async fn update(
        &self,
        owner: &Owner,
        id: CollectiveId,
        patch: Valid<CollectivePatch>,
    ) -> ApiResult<CollectiveDetail> {
        let patch = patch.into_inner();
        let conn = self.db.get_conn().await?;
        let row_id = resolve_collective(&**conn, owner, id).await?;

        let mut update = UpdateSql::new("friends.collectives");
        update
            .set_opt("name", patch.name.as_deref().map(|n| n.trim().to_string()))
            .set_opt("kind", patch.kind.map(|k| k.as_db_str()))
            .set_opt("description", patch.description.as_ref().map(|v| normalize(v.as_deref())))
            .set_opt("archived", patch.archived);
        if let Some((sql, params)) = update.build(row_id) {
            conn.execute(sql.as_str(), &params.as_refs()).await?;
        }

        load_detail(&**conn, owner, id).await
    }

    pub async fn delete(&self, owner: &Owner, id: CollectiveId) -> ApiResult<()> {
        let conn = self.db.get_conn().await?;
        let deleted = conn
            .execute(
                "DELETE FROM friends.collectives WHERE owner_id = $1 AND external_id = $2",
                &[&owner.id, &id.as_uuid()],
            )
            .await?;
        if deleted == 0 {
            return Err(ApiError::not_found("collective"));
        }
        tracing::debug!(collective_id = %id, "Deleted collective");
        Ok(())
    }

    pub async fn add_membership(
        &self,
        owner: &Owner,
        id: CollectiveId,
        input: Valid<MembershipInput>,
    ) -> ApiResult<Membership> {
        let conn = self.db.get_conn().await?;
        let collective_row = resolve_collective(&**conn, owner, id).await?;
        let membership = insert_membership(&**conn, owner, collective_row, &input).await?;
        touch(&**conn, collective_row).await?;
        load_membership(&**conn, owner, id, membership).await
    }

    pub async fn update_membership(
        &self,
        owner: &Owner,
        id: CollectiveId,
        membership: MembershipId,
        patch: Valid<MembershipPatch>,
    ) -> ApiResult<Membership> {
        let patch = patch.into_inner();
        let conn = self.db.get_conn().await?;
        let row_id = resolve_membership(&**conn, owner, id, membership).await?;

        let mut update = UpdateSql::new("friends.collective_memberships");
        update
            .set_opt("role", patch.role.as_deref().map(|r| r.trim().to_string()))
            .set_opt("since", patch.since);
        if let Some((sql, params)) = update.build(row_id) {
            conn.execute(sql.as_str(), &params.as_refs()).await?;
        }

        load_membership(&**conn, owner, id, membership).await
    }

    pub async fn delete_membership(
        &self,
        owner: &Owner,
        id: CollectiveId,
        membership: MembershipId,
    ) -> ApiResult<()> {
        let conn = self.db.get_conn().await?;
        let row_id = resolve_membership(&**conn, owner, id, membership).await?;
        conn.execute("DELETE FROM friends.collective_memberships WHERE id = $1", &[&row_id])
            .await?;
        tracing::debug!(collective_id = %id, membership_id = %membership, "Removed membership");
        Ok(())
    }
}

// ============================================================================
// HELPERS
// ============================================================================

async fn resolve_collective<C: GenericClient + Sync>(
    client: &C,
    owner: &Owner,
    id: CollectiveId,
) -> ApiResult<i64> {
    let row = client
        .query_opt(
            "SELECT id FROM friends.collectives WHERE owner_id = $1 AND external_id = $2",
            &[&owner.id, &id.as_uuid()],
        )
        .await?
        .ok_or_else(|| ApiError::not_found("collective"))?;
    Ok(row.try_get("id")?)
}

/// Membership row inside the given collective; memberships of deleted friends are gone.
async fn resolve_membership<C: GenericClient + Sync>(
    client: &C,
    owner: &Owner,
    id: CollectiveId,
    membership: MembershipId,
) -> ApiResult<i64> {
    let row = client
        .query_opt(
            "SELECT m.id FROM friends.collective_memberships m \
             JOIN friends.collectives co ON co.id = m.collective_id \
             JOIN friends.friends f ON f.id = m.friend_id \
             WHERE co.owner_id = $1 AND co.external_id = $2 AND m.external_id = $3 \
               AND f.deleted_at IS NULL",
            &[&owner.id, &id.as_uuid(), &membership.as_uuid()],
        )
        .await?
        .ok_or_else(|| ApiError::not_found("membership"))?;
    Ok(row.try_get("id")?)
}

async fn insert_membership<C: GenericClient + Sync>(
    client: &C,
    owner: &Owner,
    collective_row: i64,
    input: &MembershipInput,
) -> ApiResult<MembershipId> {
    let friend_row = resolve_friend(client, owner, input.friend_id).await?;
    let id = MembershipId::now_v7();
    client
        .execute(
            "INSERT INTO friends.collective_memberships \
             (external_id, collective_id, friend_id, role, since) VALUES ($1, $2, $3, $4, $5)",
            &[&id.as_uuid(), &collective_row, &friend_row, &input.role.trim(), &input.since],
        )
        .await?;
    Ok(id)
}

async fn touch<C: GenericClient + Sync>(client: &C, collective_row: i64) -> ApiResult<()> {
    client
        .execute(
            "UPDATE friends.collectives SET updated_at = now() WHERE id = $1",
            &[&collective_row],
        )
        .await?;
    Ok(())
}

async fn load_detail<C: GenericClient + Sync>(
    client: &C,
    owner: &Owner,
    id: CollectiveId,
) -> ApiResult<CollectiveDetail> {
    let row = client
        .query_opt(
            format!(
                "SELECT {} FROM friends.collectives co WHERE co.owner_id = $1 AND co.external_id = $2",
                collective_columns()
            )
            .as_str(),
            &[&owner.id, &id.as_uuid()],
        )
        .await?
        .ok_or_else(|| ApiError::not_found("collective"))?;
    let collective = collective_from_row(&row)?;

    let rows = client
        .query(
            format!(
                "SELECT {MEMBERSHIP_COLUMNS} FROM {MEMBERSHIP_FROM} \
                 WHERE co.owner_id = $1 AND co.external_id = $2 AND f.deleted_at IS NULL \
                 ORDER BY lower(c.display_name), m.id"
            )
            .as_str(),
            &[&owner.id, &id.as_uuid()],
        )
        .await?;
    let memberships = rows.iter().map(membership_from_row).collect::<ApiResult<Vec<_>>>()?;

    Ok(CollectiveDetail {
        suggested_roles: suggested_roles(collective.kind),
        collective,
        memberships,
    })
}

async fn load_membership<C: GenericClient + Sync>(
    client: &C,
    owner: &Owner,
    id: CollectiveId,
    membership: MembershipId,
) -> ApiResult<Membership> {
    let row = client
        .query_opt(
            format!(
                "SELECT {MEMBERSHIP_COLUMNS} FROM {MEMBERSHIP_FROM} \
                 WHERE co.owner_id = $1 AND co.external_id = $2 AND m.external_id = $3"
            )
            .as_str(),
            &[&owner.id, &id.as_uuid(), &membership.as_uuid()],
        )
        .await?
        .ok_or_else(|| ApiError::not_found("membership"))?;
    membership_from_row(&row)
}

fn suggested_roles(kind: CollectiveKind) -> Vec<String> {
    kind.suggested_roles().iter().map(|r| r.to_string()).collect()
}

fn collective_from_row(row: &Row) -> ApiResult<Collective> {
    let kind: String = row.try_get("kind")?;
    Ok(Collective {
        id: ext_id(row, "external_id")?,
        name: row.try_get("name")?,
        kind: CollectiveKind::from_db_str(&kind).map_err(ApiError::internal_error)?,
        description: row.try_get("description")?,
        archived: row.try_get("archived")?,
        member_count: row.try_get("member_count")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn membership_from_row(row: &Row) -> ApiResult<Membership> {
    Ok(Membership {
        id: ext_id(row, "external_id")?,
        collective_id: ext_id(row, "collective_external_id")?,
        friend_id: ext_id(row, "friend_external_id")?,
        friend_name: row.try_get("friend_name")?,
        role: row.try_get("role")?,
        since: row.try_get("since")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_count_sort_uses_live_members() {
        let column = sort_column(CollectiveSort::MemberCount);
        assert!(column.contains("count(*)"));
        assert!(column.contains("f.deleted_at IS NULL"));
    }

    #[test]
    fn test_suggested_roles_follow_kind() {
        let roles = suggested_roles(CollectiveKind::Family);
        assert!(!roles.is_empty());
        assert_eq!(roles.len(), CollectiveKind::Family.suggested_roles().len());
    }

    #[test]
    fn test_kind_facet_binds_db_string() {
        let query = CollectiveListQuery::from_pairs([("kind", "CLUB")]).unwrap();
        assert_eq!(query.facets().kind, Some(CollectiveKind::Club));
        let list = list_sql(7, &query);
        assert_eq!(list.where_clause(), "co.owner_id = $1 AND co.kind = $2");
        assert_eq!(list.params().len(), 2);
    }

    #[test]
    fn test_member_facet_ignores_deleted_friends() {
        let member = kith_core::FriendId::now_v7().to_string();
        let query =
            CollectiveListQuery::from_pairs([("member", member.as_str()), ("archived", "true")]).unwrap();
        let filter = list_sql(7, &query).where_clause();

        assert!(filter.starts_with("co.owner_id = $1 AND EXISTS ("));
        assert!(filter.contains("f.deleted_at IS NULL AND f.external_id = $2)"));
        assert!(filter.ends_with(" AND co.archived"));
        assert!(!filter.contains("co.kind"));
    }
}
