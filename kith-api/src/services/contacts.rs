//! Contacts and their nested detail collections.
//!
//! Detail rows carry a `position` so collections come back in the order the
//! client sent them. A supplied collection always replaces the stored one.

use kith_core::schema::normalize;
use kith_core::{
    Address, Contact, ContactDetails, ContactId, ContactInput, ContactListQuery, ContactPatch,
    ContactSort, ContactSummary, DateKind, Email, EntityIdType, Page, Phone, Position,
    SignificantDate, SocialProfile, Valid, WebLink,
};
use tokio_postgres::{GenericClient, Row};

use super::{ext_id, Owner};
use crate::db::DbClient;
use crate::error::{ApiError, ApiResult};
use crate::sql::{fetch_page, ListSql, SearchField, UpdateSql};

/// Summary columns of `contacts.contacts c`, aliased so they can sit next
/// to another table's columns in one row.
pub(crate) const CONTACT_SUMMARY_COLUMNS: &str = "\
c.external_id AS contact_external_id, c.display_name, c.given_name, c.family_name, \
c.nickname, c.birthday, c.photo_url, c.archived AS contact_archived, \
EXISTS (SELECT 1 FROM friends.friends fr WHERE fr.contact_id = c.id AND fr.deleted_at IS NULL) AS is_friend, \
c.created_at AS contact_created_at, c.updated_at AS contact_updated_at";

const IS_FRIEND: &str =
    "EXISTS (SELECT 1 FROM friends.friends fr WHERE fr.contact_id = c.id AND fr.deleted_at IS NULL)";

const SEARCH_FIELDS: &[SearchField<'static>] = &[
    SearchField::Column("c.display_name"),
    SearchField::Column("c.given_name"),
    SearchField::Column("c.family_name"),
    SearchField::Column("c.nickname"),
    SearchField::Child {
        table: "contacts.emails",
        foreign_key: "contact_id",
        parent_key: "c.id",
        column: "address",
    },
    SearchField::Child {
        table: "contacts.phones",
        foreign_key: "contact_id",
        parent_key: "c.id",
        column: "number",
    },
];

fn sort_column(sort: ContactSort) -> &'static str {
    match sort {
        ContactSort::DisplayName => "lower(c.display_name)",
        ContactSort::CreatedAt => "c.created_at",
        ContactSort::UpdatedAt => "c.updated_at",
    }
}

fn list_sql(owner_id: i64, query: &ContactListQuery) -> ListSql {
    let facets = query.facets();
    let mut list = ListSql::owned_by("contacts.contacts c", "c", owner_id);
    list.and("c.deleted_at IS NULL")
        .and_flag(facets.archived, "c.archived")
        .and_flag(facets.is_friend, IS_FRIEND)
        .and_flag(facets.has_birthday, "c.birthday IS NOT NULL")
        .search(query.search(), SEARCH_FIELDS);
    list
}

#[derive(Clone)]
pub struct ContactService {
    db: DbClient,
}

impl ContactService {
    pub fn new(db: DbClient) -> Self {
        Self { db }
    }

    pub async fn list(&self, owner: &Owner, query: ContactListQuery) -> ApiResult<Page<ContactSummary>> {
        let query = query.with_preferred_page_size(owner.preferred_page_size);
        let list = list_sql(owner.id, &query);

        let sql = list.page_sql(
            CONTACT_SUMMARY_COLUMNS,
            sort_column(query.sort()),
            query.direction(),
            query.pagination(),
        );
        let mut conn = self.db.get_conn().await?;
        fetch_page(&mut conn, &list, &sql, query.pagination(), summary_from_row).await
    }

    pub async fn get(&self, owner: &Owner, id: ContactId) -> ApiResult<Contact> {
        let conn = self.db.get_conn().await?;
        load(&**conn, owner, id).await
    }

    pub async fn create(&self, owner: &Owner, input: Valid<ContactInput>) -> ApiResult<Contact> {
        let mut conn = self.db.get_conn().await?;
        let tx = conn.transaction().await?;
        let (_, id) = insert_contact(&*tx, owner, &input).await?;
        tx.commit().await?;

        tracing::debug!(contact_id = %id, "Created contact");
        load(&**conn, owner, id).await
    }

    pub async fn update(
        &self,
        owner: &Owner,
        id: ContactId,
        patch: Valid<ContactPatch>,
    ) -> ApiResult<Contact> {
        let patch = patch.into_inner();
        let mut conn = self.db.get_conn().await?;
        let tx = conn.transaction().await?;
        let row_id = lock_contact(&*tx, owner, id).await?;

        let mut update = UpdateSql::new("contacts.contacts");
        update
            .set_opt(
                "display_name",
                patch.display_name.as_deref().map(|n| n.trim().to_string()),
            )
            .set_opt("given_name", patch.given_name.as_ref().map(|v| normalize(v.as_deref())))
            .set_opt("family_name", patch.family_name.as_ref().map(|v| normalize(v.as_deref())))
            .set_opt("nickname", patch.nickname.as_ref().map(|v| normalize(v.as_deref())))
            .set_opt("birthday", patch.birthday)
            .set_opt("notes", patch.notes.as_ref().map(|v| normalize(v.as_deref())))
            .set_opt("photo_url", patch.photo_url.as_ref().map(|v| normalize(v.as_deref())))
            .set_opt("archived", patch.archived);

        match update.build(row_id) {
            Some((sql, params)) => {
                tx.execute(sql.as_str(), &params.as_refs()).await?;
            }
            None => {
                tx.execute(
                    "UPDATE contacts.contacts SET updated_at = now() WHERE id = $1",
                    &[&row_id],
                )
                .await?;
            }
        }
        write_details(&*tx, row_id, &DetailsUpdate::from_patch(&patch)).await?;
        tx.commit().await?;

        load(&**conn, owner, id).await
    }

    /// Soft delete. A contact that still backs a live friend is a conflict.
    pub async fn delete(&self, owner: &Owner, id: ContactId) -> ApiResult<()> {
        let mut conn = self.db.get_conn().await?;
        let tx = conn.transaction().await?;
        let row_id = lock_contact(&*tx, owner, id).await?;

        let backing: bool = tx
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM friends.friends \
                 WHERE contact_id = $1 AND deleted_at IS NULL)",
                &[&row_id],
            )
            .await?
            .try_get(0)?;
        if backing {
            return Err(ApiError::conflict(
                "Contact is still linked to a friend; delete the friend first",
            ));
        }

        tx.execute(
            "UPDATE contacts.contacts SET deleted_at = now(), updated_at = now() WHERE id = $1",
            &[&row_id],
        )
        .await?;
        tx.commit().await?;

        tracing::debug!(contact_id = %id, "Deleted contact");
        Ok(())
    }
}

// ============================================================================
// SHARED WITH FRIENDS
// ============================================================================

/// Internal id of a live contact, locked for the rest of the transaction.
pub(crate) async fn lock_contact<C: GenericClient + Sync>(
    client: &C,
    owner: &Owner,
    id: ContactId,
) -> ApiResult<i64> {
    let row = client
        .query_opt(
            "SELECT id FROM contacts.contacts \
             WHERE owner_id = $1 AND external_id = $2 AND deleted_at IS NULL FOR UPDATE",
            &[&owner.id, &id.as_uuid()],
        )
        .await?
        .ok_or_else(|| ApiError::not_found("contact"))?;
    Ok(row.try_get("id")?)
}

/// Insert a contact with all its details. Returns the internal and external ids.
pub(crate) async fn insert_contact<C: GenericClient + Sync>(
    client: &C,
    owner: &Owner,
    input: &ContactInput,
) -> ApiResult<(i64, ContactId)> {
    let id = ContactId::now_v7();
    let row = client
        .query_one(
            "INSERT INTO contacts.contacts \
             (external_id, owner_id, display_name, given_name, family_name, nickname, \
              birthday, notes, photo_url, archived) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING id",
            &[
                &id.as_uuid(),
                &owner.id,
                &input.display_name.trim(),
                &normalize(input.given_name.as_deref()),
                &normalize(input.family_name.as_deref()),
                &normalize(input.nickname.as_deref()),
                &input.birthday,
                &normalize(input.notes.as_deref()),
                &normalize(input.photo_url.as_deref()),
                &input.archived,
            ],
        )
        .await?;
    let row_id: i64 = row.try_get("id")?;
    write_details(client, row_id, &DetailsUpdate::all(input)).await?;
    Ok((row_id, id))
}

pub(crate) fn summary_from_row(row: &Row) -> ApiResult<ContactSummary> {
    Ok(ContactSummary {
        id: ext_id(row, "contact_external_id")?,
        display_name: row.try_get("display_name")?,
        given_name: row.try_get("given_name")?,
        family_name: row.try_get("family_name")?,
        nickname: row.try_get("nickname")?,
        birthday: row.try_get("birthday")?,
        photo_url: row.try_get("photo_url")?,
        archived: row.try_get("contact_archived")?,
        is_friend: row.try_get("is_friend")?,
        created_at: row.try_get("contact_created_at")?,
        updated_at: row.try_get("contact_updated_at")?,
    })
}

// ============================================================================
// LOADING
// ============================================================================

async fn load<C: GenericClient + Sync>(client: &C, owner: &Owner, id: ContactId) -> ApiResult<Contact> {
    let sql = format!(
        "SELECT c.id, c.notes, {CONTACT_SUMMARY_COLUMNS} FROM contacts.contacts c \
         WHERE c.owner_id = $1 AND c.external_id = $2 AND c.deleted_at IS NULL"
    );
    let row = client
        .query_opt(sql.as_str(), &[&owner.id, &id.as_uuid()])
        .await?
        .ok_or_else(|| ApiError::not_found("contact"))?;

    let row_id: i64 = row.try_get("id")?;
    Ok(Contact {
        summary: summary_from_row(&row)?,
        notes: row.try_get("notes")?,
        details: load_details(client, row_id).await?,
    })
}

async fn load_details<C: GenericClient + Sync>(client: &C, contact_id: i64) -> ApiResult<ContactDetails> {
    async fn rows<C: GenericClient + Sync, T>(
        client: &C,
        sql: &str,
        contact_id: i64,
        map: fn(&Row) -> ApiResult<T>,
    ) -> ApiResult<Vec<T>> {
        client
            .query(sql, &[&contact_id])
            .await?
            .iter()
            .map(map)
            .collect()
    }

    Ok(ContactDetails {
        addresses: rows(
            client,
            "SELECT label, street, locality, region, postal_code, country_code \
             FROM contacts.addresses WHERE contact_id = $1 ORDER BY position",
            contact_id,
            address_from_row,
        )
        .await?,
        phones: rows(
            client,
            "SELECT label, number FROM contacts.phones WHERE contact_id = $1 ORDER BY position",
            contact_id,
            |r| Ok(Phone { label: r.try_get("label")?, number: r.try_get("number")? }),
        )
        .await?,
        emails: rows(
            client,
            "SELECT label, address FROM contacts.emails WHERE contact_id = $1 ORDER BY position",
            contact_id,
            |r| Ok(Email { label: r.try_get("label")?, address: r.try_get("address")? }),
        )
        .await?,
        urls: rows(
            client,
            "SELECT label, url FROM contacts.urls WHERE contact_id = $1 ORDER BY position",
            contact_id,
            |r| Ok(WebLink { label: r.try_get("label")?, url: r.try_get("url")? }),
        )
        .await?,
        dates: rows(
            client,
            "SELECT kind, label, date FROM contacts.dates WHERE contact_id = $1 ORDER BY position",
            contact_id,
            date_from_row,
        )
        .await?,
        social_profiles: rows(
            client,
            "SELECT network, handle FROM contacts.social_profiles \
             WHERE contact_id = $1 ORDER BY position",
            contact_id,
            |r| Ok(SocialProfile { network: r.try_get("network")?, handle: r.try_get("handle")? }),
        )
        .await?,
        professional_history: rows(
            client,
            "SELECT organization, title, started_on, ended_on FROM contacts.professional_history \
             WHERE contact_id = $1 ORDER BY position",
            contact_id,
            position_from_row,
        )
        .await?,
    })
}

fn address_from_row(row: &Row) -> ApiResult<Address> {
    Ok(Address {
        label: row.try_get("label")?,
        street: row.try_get("street")?,
        locality: row.try_get("locality")?,
        region: row.try_get("region")?,
        postal_code: row.try_get("postal_code")?,
        country_code: row.try_get("country_code")?,
    })
}

fn date_from_row(row: &Row) -> ApiResult<SignificantDate> {
    let kind: String = row.try_get("kind")?;
    Ok(SignificantDate {
        kind: DateKind::from_db_str(&kind).map_err(ApiError::internal_error)?,
        label: row.try_get("label")?,
        date: row.try_get("date")?,
    })
}

fn position_from_row(row: &Row) -> ApiResult<Position> {
    Ok(Position {
        organization: row.try_get("organization")?,
        title: row.try_get("title")?,
        started_on: row.try_get("started_on")?,
        ended_on: row.try_get("ended_on")?,
    })
}

// ============================================================================
// WRITING DETAILS
// ============================================================================

/// Which nested collections to replace; `None` leaves one untouched.
#[derive(Debug, Default)]
struct DetailsUpdate<'a> {
    addresses: Option<&'a [Address]>,
    phones: Option<&'a [Phone]>,
    emails: Option<&'a [Email]>,
    urls: Option<&'a [WebLink]>,
    dates: Option<&'a [SignificantDate]>,
    social_profiles: Option<&'a [SocialProfile]>,
    professional_history: Option<&'a [Position]>,
}

impl<'a> DetailsUpdate<'a> {
    fn all(input: &'a ContactInput) -> Self {
        Self {
            addresses: Some(&input.addresses),
            phones: Some(&input.phones),
            emails: Some(&input.emails),
            urls: Some(&input.urls),
            dates: Some(&input.dates),
            social_profiles: Some(&input.social_profiles),
            professional_history: Some(&input.professional_history),
        }
    }

    fn from_patch(patch: &'a ContactPatch) -> Self {
        Self {
            addresses: patch.addresses.as_deref(),
            phones: patch.phones.as_deref(),
            emails: patch.emails.as_deref(),
            urls: patch.urls.as_deref(),
            dates: patch.dates.as_deref(),
            social_profiles: patch.social_profiles.as_deref(),
            professional_history: patch.professional_history.as_deref(),
        }
    }
}

async fn clear<C: GenericClient + Sync>(client: &C, table: &str, contact_id: i64) -> ApiResult<()> {
    let sql = format!("DELETE FROM {table} WHERE contact_id = $1");
    client.execute(sql.as_str(), &[&contact_id]).await?;
    Ok(())
}

async fn write_details<C: GenericClient + Sync>(
    client: &C,
    contact_id: i64,
    update: &DetailsUpdate<'_>,
) -> ApiResult<()> {
    if let Some(items) = update.addresses {
        clear(client, "contacts.addresses", contact_id).await?;
        for (position, a) in (0i32..).zip(items) {
            client
                .execute(
                    "INSERT INTO contacts.addresses \
                     (contact_id, position, label, street, locality, region, postal_code, country_code) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                    &[
                        &contact_id,
                        &position,
                        &normalize(a.label.as_deref()),
                        &normalize(a.street.as_deref()),
                        &normalize(a.locality.as_deref()),
                        &normalize(a.region.as_deref()),
                        &normalize(a.postal_code.as_deref()),
                        &normalize(a.country_code.as_deref()),
                    ],
                )
                .await?;
        }
    }

    if let Some(items) = update.phones {
        clear(client, "contacts.phones", contact_id).await?;
        for (position, p) in (0i32..).zip(items) {
            client
                .execute(
                    "INSERT INTO contacts.phones (contact_id, position, label, number) \
                     VALUES ($1, $2, $3, $4)",
                    &[&contact_id, &position, &normalize(p.label.as_deref()), &p.number.trim()],
                )
                .await?;
        }
    }

    if let Some(items) = update.emails {
        clear(client, "contacts.emails", contact_id).await?;
        for (position, e) in (0i32..).zip(items) {
            client
                .execute(
                    "INSERT INTO contacts.emails (contact_id, position, label, address) \
                     VALUES ($1, $2, $3, $4)",
                    &[&contact_id, &position, &normalize(e.label.as_deref()), &e.address.trim()],
                )
                .await?;
        }
    }

    if let Some(items) = update.urls {
        clear(client, "contacts.urls", contact_id).await?;
        for (position, u) in (0i32..).zip(items) {
            client
                .execute(
                    "INSERT INTO contacts.urls (contact_id, position, label, url) \
                     VALUES ($1, $2, $3, $4)",
                    &[&contact_id, &position, &normalize(u.label.as_deref()), &u.url.trim()],
                )
                .await?;
        }
    }

    if let Some(items) = update.dates {
        clear(client, "contacts.dates", contact_id).await?;
        for (position, d) in (0i32..).zip(items) {
            client
                .execute(
                    "INSERT INTO contacts.dates (contact_id, position, kind, label, date) \
                     VALUES ($1, $2, $3, $4, $5)",
                    &[
                        &contact_id,
                        &position,
                        &d.kind.as_db_str(),
                        &normalize(d.label.as_deref()),
                        &d.date,
                    ],
                )
                .await?;
        }
    }

    if let Some(items) = update.social_profiles {
        clear(client, "contacts.social_profiles", contact_id).await?;
        for (position, s) in (0i32..).zip(items) {
            client
                .execute(
                    "INSERT INTO contacts.social_profiles (contact_id, position, network, handle) \
                     VALUES ($1, $2, $3, $4)",
                    &[&contact_id, &position, &s.network.trim(), &s.handle.trim()],
                )
                .await?;
        }
    }

    if let Some(items) = update.professional_history {
        clear(client, "contacts.professional_history", contact_id).await?;
        for (position, p) in (0i32..).zip(items) {
            client
                .execute(
                    "INSERT INTO contacts.professional_history \
                     (contact_id, position, organization, title, started_on, ended_on) \
                     VALUES ($1, $2, $3, $4, $5, $6)",
                    &[
                        &contact_id,
                        &position,
                        &p.organization.trim(),
                        &normalize(p.title.as_deref()),
                        &p.started_on,
                        &p.ended_on,
                    ],
                )
                .await?;
        }
    }

    Ok(())
}
