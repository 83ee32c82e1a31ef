//! Place prefix search over the `geodata` reference tables.

use kith_core::{escape_like, Place, QueryParams, ValidationErrors};
use tokio_postgres::Row;

use super::ext_id;
use crate::db::DbClient;
use crate::error::ApiResult;

pub const MAX_QUERY_LEN: usize = 100;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 50;

/// Parsed `?q=&country=&limit=`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressQuery {
    pub q: String,
    /// ISO-3166 alpha-2, uppercased.
    pub country: Option<String>,
    pub limit: i64,
}

impl AddressQuery {
    pub fn parse(params: &QueryParams) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let q = match params.first_non_blank("q") {
            None => {
                errors.push("q", "is required");
                String::new()
            }
            Some(q) if q.chars().count() > MAX_QUERY_LEN => {
                errors.push("q", format!("must be at most {MAX_QUERY_LEN} characters"));
                String::new()
            }
            Some(q) => q.to_string(),
        };

        let country = params.first_non_blank("country").and_then(|raw| {
            if raw.len() == 2 && raw.chars().all(|c| c.is_ascii_alphabetic()) {
                Some(raw.to_ascii_uppercase())
            } else {
                errors.push("country", "must be a two-letter country code");
                None
            }
        });

        let limit = match params.first_non_blank("limit") {
            None => DEFAULT_LIMIT,
            Some(raw) => match raw.parse::<i64>() {
                Ok(n) if (1..=MAX_LIMIT).contains(&n) => n,
                _ => {
                    errors.push("limit", format!("must be an integer between 1 and {MAX_LIMIT}"));
                    DEFAULT_LIMIT
                }
            },
        };

        errors.into_result(Self { q, country, limit })
    }

    /// Case-insensitive prefix pattern with LIKE metacharacters escaped.
    pub fn prefix_pattern(&self) -> String {
        format!("{}%", escape_like(&self.q.to_lowercase()))
    }
}

#[derive(Clone)]
pub struct AddressService {
    db: DbClient,
}

impl AddressService {
    pub fn new(db: DbClient) -> Self {
        Self { db }
    }

    /// Places whose name starts with `q`. Reference data, not owner-scoped.
    pub async fn lookup(&self, query: &AddressQuery) -> ApiResult<Vec<Place>> {
        let conn = self.db.get_conn().await?;
        let rows = conn
            .query(
                "SELECT external_id, name, admin_area, country_code, postal_code, latitude, longitude \
                 FROM geodata.places \
                 WHERE lower(name) LIKE $1 ESCAPE '\\' \
                   AND ($2::text IS NULL OR country_code = $2) \
                 ORDER BY name, id LIMIT $3",
                &[&query.prefix_pattern(), &query.country, &query.limit],
            )
            .await?;
        rows.iter().map(place_from_row).collect()
    }
}

fn place_from_row(row: &Row) -> ApiResult<Place> {
    Ok(Place {
        id: ext_id(row, "external_id")?,
        name: row.try_get("name")?,
        admin_area: row.try_get("admin_area")?,
        country_code: row.try_get("country_code")?,
        postal_code: row.try_get("postal_code")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
    })
}
