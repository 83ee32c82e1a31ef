//! Owner-scoped SQL construction for list and update queries.
//!
//! Every statement built here starts from `owner_id = $1`. Values always
//! travel as bind parameters; only validated integers (limit, offset) and
//! fixed column names are spliced into the text.

use deadpool_postgres::Object;
use kith_core::{Page, Pagination, SearchTerm, SortDirection};
use tokio_postgres::{types::ToSql, IsolationLevel, Row};

use crate::error::ApiResult;

/// Owned bind parameter. `Send` so handler futures stay `Send`.
pub type SqlParam = Box<dyn ToSql + Sync + Send>;

// ============================================================================
// PARAMS
// ============================================================================

/// Positional parameter list that hands out `$n` placeholders.
#[derive(Default)]
pub struct Params {
    values: Vec<SqlParam>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value and return its placeholder.
    pub fn push<T: ToSql + Sync + Send + 'static>(&mut self, value: T) -> String {
        self.values.push(Box::new(value));
        format!("${}", self.values.len())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.values
            .iter()
            .map(|v| v.as_ref() as &(dyn ToSql + Sync))
            .collect()
    }
}

// ============================================================================
// SEARCH
// ============================================================================

/// One place a free-text search looks.
#[derive(Debug, Clone, Copy)]
pub enum SearchField<'a> {
    /// A column of the listed rows, e.g. `c.display_name`.
    Column(&'a str),
    /// A column of a child table joined on `parent_key`.
    Child {
        table: &'a str,
        foreign_key: &'a str,
        parent_key: &'a str,
        column: &'a str,
    },
}

impl SearchField<'_> {
    fn matches(&self, placeholder: &str) -> String {
        match self {
            SearchField::Column(column) => format!("{column} ILIKE {placeholder} ESCAPE '\\'"),
            SearchField::Child {
                table,
                foreign_key,
                parent_key,
                column,
            } => format!(
                "EXISTS (SELECT 1 FROM {table} s WHERE s.{foreign_key} = {parent_key} \
                 AND s.{column} ILIKE {placeholder} ESCAPE '\\')"
            ),
        }
    }
}

// ============================================================================
// LIST SQL
// ============================================================================

/// `FROM ... WHERE ...` shared by a page query and its count.
pub struct ListSql {
    from: String,
    key_column: String,
    conditions: Vec<String>,
    params: Params,
}

impl ListSql {
    /// Rows of `from` owned by `owner_id`. `alias` names the primary table.
    pub fn owned_by(from: impl Into<String>, alias: &str, owner_id: i64) -> Self {
        let mut params = Params::new();
        let owner = params.push(owner_id);
        Self {
            from: from.into(),
            key_column: format!("{alias}.id"),
            conditions: vec![format!("{alias}.owner_id = {owner}")],
            params,
        }
    }

    pub fn param<T: ToSql + Sync + Send + 'static>(&mut self, value: T) -> String {
        self.params.push(value)
    }

    pub fn and(&mut self, condition: impl Into<String>) -> &mut Self {
        self.conditions.push(condition.into());
        self
    }

    /// `condition` applied as-is for `Some(true)`, negated for `Some(false)`.
    pub fn and_flag(&mut self, flag: Option<bool>, condition: &str) -> &mut Self {
        match flag {
            Some(true) => self.and(condition.to_string()),
            Some(false) => self.and(format!("NOT ({condition})")),
            None => self,
        }
    }

    /// OR-combined `ILIKE` over `fields`, one shared pattern parameter.
    pub fn search(&mut self, term: Option<&SearchTerm>, fields: &[SearchField<'_>]) -> &mut Self {
        let Some(term) = term else {
            return self;
        };
        if fields.is_empty() {
            return self;
        }
        let placeholder = self.params.push(term.like_pattern());
        let clauses: Vec<String> = fields.iter().map(|f| f.matches(&placeholder)).collect();
        self.and(format!("({})", clauses.join(" OR ")))
    }

    pub fn where_clause(&self) -> String {
        self.conditions.join(" AND ")
    }

    pub fn count_sql(&self) -> String {
        format!("SELECT count(*) FROM {} WHERE {}", self.from, self.where_clause())
    }

    /// Page query ordered by `order_by`, tie-broken on the primary key.
    pub fn page_sql(
        &self,
        select: &str,
        order_by: &str,
        direction: SortDirection,
        pagination: Pagination,
    ) -> String {
        let dir = direction.as_sql();
        format!(
            "SELECT {select} FROM {from} WHERE {filter} \
             ORDER BY {order_by} {dir} NULLS LAST, {key} {dir} \
             LIMIT {limit} OFFSET {offset}",
            from = self.from,
            filter = self.where_clause(),
            key = self.key_column,
            limit = pagination.limit(),
            offset = pagination.offset(),
        )
    }

    pub fn params(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.as_refs()
    }
}

/// Run the count and page queries in one read-only snapshot.
pub async fn fetch_page<T>(
    conn: &mut Object,
    list: &ListSql,
    page_sql: &str,
    pagination: Pagination,
    map: impl Fn(&Row) -> ApiResult<T>,
) -> ApiResult<Page<T>> {
    let tx = conn
        .build_transaction()
        .isolation_level(IsolationLevel::RepeatableRead)
        .read_only(true)
        .start()
        .await?;

    let params = list.params();
    let total: i64 = tx.query_one(list.count_sql().as_str(), &params).await?.try_get(0)?;
    let rows = tx.query(page_sql, &params).await?;
    tx.commit().await?;

    let items = rows.iter().map(map).collect::<ApiResult<Vec<T>>>()?;
    Ok(Page::new(items, total, pagination))
}

// ============================================================================
// UPDATE SQL
// ============================================================================

/// `UPDATE ... SET` builder for patches. Nothing is emitted when no
/// assignment was added.
pub struct UpdateSql {
    table: String,
    assignments: Vec<String>,
    params: Params,
}

impl UpdateSql {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            assignments: Vec::new(),
            params: Params::new(),
        }
    }

    pub fn set<T: ToSql + Sync + Send + 'static>(&mut self, column: &str, value: T) -> &mut Self {
        let placeholder = self.params.push(value);
        self.assignments.push(format!("{column} = {placeholder}"));
        self
    }

    /// Assign when the patch carries the field.
    pub fn set_opt<T: ToSql + Sync + Send + 'static>(
        &mut self,
        column: &str,
        value: Option<T>,
    ) -> &mut Self {
        if let Some(value) = value {
            self.set(column, value);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// `UPDATE table SET ..., updated_at = now() WHERE id = $n`, or `None`
    /// when there is nothing to set.
    pub fn build(mut self, row_id: i64) -> Option<(String, Params)> {
        if self.assignments.is_empty() {
            return None;
        }
        let id = self.params.push(row_id);
        let sql = format!(
            "UPDATE {} SET {}, updated_at = now() WHERE id = {}",
            self.table,
            self.assignments.join(", "),
            id
        );
        Some((sql, self.params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kith_core::PageSize;

    fn pagination(page: u32, page_size: PageSize) -> Pagination {
        Pagination { page, page_size }
    }

    #[test]
    fn test_owner_scope_is_first_param() {
        let list = ListSql::owned_by("friends.friends f", "f", 7);
        assert_eq!(list.where_clause(), "f.owner_id = $1");
        assert_eq!(list.params().len(), 1);
    }

    #[test]
    fn test_search_shares_one_pattern() {
        let term = SearchTerm::parse("50%_off").unwrap().unwrap();
        let mut list = ListSql::owned_by("contacts.contacts c", "c", 1);
        list.search(
            Some(&term),
            &[
                SearchField::Column("c.display_name"),
                SearchField::Child {
                    table: "contacts.emails",
                    foreign_key: "contact_id",
                    parent_key: "c.id",
                    column: "address",
                },
            ],
        );
        let filter = list.where_clause();
        assert!(filter.contains("c.display_name ILIKE $2 ESCAPE '\\'"));
        assert!(filter.contains("s.address ILIKE $2 ESCAPE '\\'"));
        assert!(filter.contains(" OR "));
        assert_eq!(list.params().len(), 2);
        assert_eq!(term.like_pattern(), "%50\\%\\_off%");
    }

    #[test]
    fn test_no_search_adds_nothing() {
        let mut list = ListSql::owned_by("contacts.contacts c", "c", 1);
        list.search(None, &[SearchField::Column("c.display_name")]);
        assert_eq!(list.params().len(), 1);
    }

    #[test]
    fn test_flags() {
        let mut list = ListSql::owned_by("friends.friends f", "f", 1);
        list.and_flag(Some(true), "f.favorite")
            .and_flag(Some(false), "f.archived")
            .and_flag(None, "f.is_self");
        assert_eq!(
            list.where_clause(),
            "f.owner_id = $1 AND f.favorite AND NOT (f.archived)"
        );
    }

    #[test]
    fn test_page_sql_tie_breaks_on_key() {
        let list = ListSql::owned_by("encounters e", "e", 1);
        let sql = list.page_sql("e.title", "e.occurred_on", SortDirection::Desc, pagination(3, PageSize::Ten));
        assert!(sql.ends_with(
            "ORDER BY e.occurred_on DESC NULLS LAST, e.id DESC LIMIT 10 OFFSET 20"
        ));
        assert_eq!(list.count_sql(), "SELECT count(*) FROM encounters e WHERE e.owner_id = $1");
    }

    #[test]
    fn test_update_sql() {
        let mut update = UpdateSql::new("friends.circles");
        update.set("name", "Climbing".to_string());
        update.set_opt::<Option<String>>("color", Some(None));
        update.set_opt::<String>("description", None);
        let (sql, params) = update.build(42).unwrap();
        assert_eq!(
            sql,
            "UPDATE friends.circles SET name = $1, color = $2, updated_at = now() WHERE id = $3"
        );
        assert_eq!(params.len(), 3);

        assert!(UpdateSql::new("friends.circles").build(1).is_none());
    }
}
