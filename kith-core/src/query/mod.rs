//! List-query parsing
//!
//! Every list endpoint accepts the same query-string grammar:
//!
//! | key        | meaning                                                    |
//! |------------|------------------------------------------------------------|
//! | `search`   | free-text filter, trimmed, at most 200 characters          |
//! | `sort`     | one of the entity's sort fields (camelCase)                |
//! | `sortDir`  | `asc` or `desc`, case-insensitive                          |
//! | `page`     | 1-based page number, at most 10 000                        |
//! | `pageSize` | 10, 25, 50 or 100; anything else falls back to the default |
//!
//! plus entity-specific facets (see [`specs`]). Parsing is a pure function
//! from the ordered `(key, value)` pairs of the query string to an immutable
//! [`ListQuery`], collecting every problem into one [`ValidationErrors`].

mod specs;

pub use specs::*;

use crate::error::ValidationErrors;
use crate::identity::{parse_id, Date, EntityIdType};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// LIMITS
// ============================================================================

/// Longest accepted search term, in characters.
pub const MAX_SEARCH_LEN: usize = 200;

/// Highest accepted page number.
pub const MAX_PAGE: u32 = 10_000;

/// Most values accepted for one repeatable facet.
pub const MAX_FACET_VALUES: usize = 20;

// ============================================================================
// QUERY PARAMS
// ============================================================================

/// Ordered, already percent-decoded query-string pairs. Repeated keys are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// First value for `key`.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First value for `key`, or `None` when absent or blank.
    pub fn first_non_blank(&self, key: &str) -> Option<&str> {
        self.first(key).map(str::trim).filter(|v| !v.is_empty())
    }

    /// Every non-blank value for `key`, in order.
    pub fn all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

// ============================================================================
// PAGE SIZE
// ============================================================================

/// One of the allowed page sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum PageSize {
    Ten,
    #[default]
    TwentyFive,
    Fifty,
    Hundred,
}

impl PageSize {
    pub const ALL: [PageSize; 4] = [
        PageSize::Ten,
        PageSize::TwentyFive,
        PageSize::Fifty,
        PageSize::Hundred,
    ];

    pub fn get(&self) -> u16 {
        match self {
            PageSize::Ten => 10,
            PageSize::TwentyFive => 25,
            PageSize::Fifty => 50,
            PageSize::Hundred => 100,
        }
    }

    pub fn from_u16(n: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|size| size.get() == n)
    }

    /// Lenient parse used for the `pageSize` query key: anything that is not
    /// exactly one of the allowed sizes yields `None`.
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        raw.trim().parse::<u16>().ok().and_then(Self::from_u16)
    }
}

impl TryFrom<u16> for PageSize {
    type Error = String;

    fn try_from(n: u16) -> Result<Self, Self::Error> {
        Self::from_u16(n).ok_or_else(|| format!("page size must be one of 10, 25, 50, 100 (got {n})"))
    }
}

impl From<PageSize> for u16 {
    fn from(size: PageSize) -> Self {
        size.get()
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

// ============================================================================
// SORTING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.eq_ignore_ascii_case("asc") {
            Some(SortDirection::Asc)
        } else if raw.eq_ignore_ascii_case("desc") {
            Some(SortDirection::Desc)
        } else {
            None
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    pub fn as_param(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// A sortable field of one entity.
pub trait SortField: Copy + Default + Eq + fmt::Debug + 'static {
    /// Every accepted field, default first.
    const ALLOWED: &'static [Self];

    /// Name used in the `sort` query key.
    fn name(&self) -> &'static str;

    /// Direction applied when `sortDir` is absent.
    fn default_direction(&self) -> SortDirection;

    fn parse(raw: &str) -> Option<Self> {
        Self::ALLOWED.iter().copied().find(|f| f.name() == raw)
    }

    fn allowed_names() -> String {
        Self::ALLOWED
            .iter()
            .map(|f| f.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ============================================================================
// SEARCH
// ============================================================================

/// Trimmed, non-empty free-text search input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchTerm(String);

impl SearchTerm {
    /// `None` for blank input, `Err` when longer than [`MAX_SEARCH_LEN`].
    pub fn parse(raw: &str) -> Result<Option<Self>, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        if trimmed.chars().count() > MAX_SEARCH_LEN {
            return Err(format!("must be at most {MAX_SEARCH_LEN} characters"));
        }
        Ok(Some(Self(trimmed.to_string())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `%term%` with LIKE metacharacters escaped, for `ILIKE $n ESCAPE '\'`.
    pub fn like_pattern(&self) -> String {
        format!("%{}%", escape_like(&self.0))
    }
}

/// Escape `\`, `%` and `_` so the input matches literally under `ESCAPE '\'`.
pub fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// ============================================================================
// PAGINATION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub page_size: PageSize,
}

impl Pagination {
    pub fn first(page_size: PageSize) -> Self {
        Self { page: 1, page_size }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size.get())
    }

    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * self.limit()
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::first(PageSize::default())
    }
}

// ============================================================================
// FACETS
// ============================================================================

/// Entity-specific filter dimensions.
pub trait Facets: Default + Clone + fmt::Debug {
    fn parse(params: &QueryParams, errors: &mut ValidationErrors) -> Self;
}

pub(crate) fn bool_facet(
    params: &QueryParams,
    key: &str,
    errors: &mut ValidationErrors,
) -> Option<bool> {
    let raw = params.first_non_blank(key)?;
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => {
            errors.push(key, "must be 'true' or 'false'");
            None
        }
    }
}

pub(crate) fn id_facet<T: EntityIdType>(
    params: &QueryParams,
    key: &str,
    errors: &mut ValidationErrors,
) -> Option<T> {
    let raw = params.first_non_blank(key)?;
    match parse_id::<T>(raw) {
        Ok(id) => Some(id),
        Err(message) => {
            errors.push(key, message);
            None
        }
    }
}

/// Repeatable id facet. Duplicates are dropped, order of first appearance kept.
pub(crate) fn id_list_facet<T: EntityIdType>(
    params: &QueryParams,
    key: &str,
    errors: &mut ValidationErrors,
) -> Vec<T> {
    let values = params.all(key);
    if values.len() > MAX_FACET_VALUES {
        errors.push(key, format!("accepts at most {MAX_FACET_VALUES} values"));
        return Vec::new();
    }

    let mut ids: Vec<T> = Vec::with_capacity(values.len());
    let mut invalid = false;
    for raw in values {
        match parse_id::<T>(raw) {
            Ok(id) if !ids.contains(&id) => ids.push(id),
            Ok(_) => {}
            Err(_) => invalid = true,
        }
    }
    if invalid {
        errors.push(key, format!("every value must be a valid {} id (UUID)", T::ENTITY_NAME));
    }
    ids
}

pub(crate) fn date_facet(
    params: &QueryParams,
    key: &str,
    errors: &mut ValidationErrors,
) -> Option<Date> {
    let raw = params.first_non_blank(key)?;
    match Date::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.push(key, "must be a date in YYYY-MM-DD format");
            None
        }
    }
}

// ============================================================================
// LIST QUERY
// ============================================================================

/// Query-string keys shared by every list endpoint.
pub mod keys {
    pub const SEARCH: &str = "search";
    pub const SORT: &str = "sort";
    pub const SORT_DIR: &str = "sortDir";
    pub const PAGE: &str = "page";
    pub const PAGE_SIZE: &str = "pageSize";
}

/// Parsed, validated list request for one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery<S, F> {
    search: Option<SearchTerm>,
    sort: S,
    direction: SortDirection,
    page: u32,
    page_size: Option<PageSize>,
    fallback_page_size: PageSize,
    facets: F,
}

impl<S: SortField, F: Facets> ListQuery<S, F> {
    /// Parse query-string pairs, reporting every malformed key.
    pub fn parse(params: &QueryParams) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let search = match params.first(keys::SEARCH) {
            Some(raw) => SearchTerm::parse(raw).unwrap_or_else(|message| {
                errors.push(keys::SEARCH, message);
                None
            }),
            None => None,
        };

        let sort = match params.first_non_blank(keys::SORT) {
            Some(raw) => S::parse(raw).unwrap_or_else(|| {
                errors.push(keys::SORT, format!("must be one of: {}", S::allowed_names()));
                S::default()
            }),
            None => S::default(),
        };

        let direction = match params.first_non_blank(keys::SORT_DIR) {
            Some(raw) => SortDirection::parse(raw).unwrap_or_else(|| {
                errors.push(keys::SORT_DIR, "must be 'asc' or 'desc'");
                sort.default_direction()
            }),
            None => sort.default_direction(),
        };

        let page = match params.first_non_blank(keys::PAGE) {
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if (1..=MAX_PAGE).contains(&n) => n,
                _ => {
                    errors.push(
                        keys::PAGE,
                        format!("must be an integer between 1 and {MAX_PAGE}"),
                    );
                    1
                }
            },
            None => 1,
        };

        // Never an error: unknown sizes fall back to the preference or default.
        let page_size = params.first(keys::PAGE_SIZE).and_then(PageSize::parse_lenient);

        let facets = F::parse(params, &mut errors);

        errors.into_result(Self {
            search,
            sort,
            direction,
            page,
            page_size,
            fallback_page_size: PageSize::default(),
            facets,
        })
    }

    /// Convenience for callers holding raw `(key, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ValidationErrors>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::parse(&QueryParams::from_pairs(pairs))
    }

    /// Use the user's preferred size when the request did not pick a valid one.
    pub fn with_preferred_page_size(mut self, preferred: Option<PageSize>) -> Self {
        self.fallback_page_size = preferred.unwrap_or_default();
        self
    }

    pub fn search(&self) -> Option<&SearchTerm> {
        self.search.as_ref()
    }

    pub fn sort(&self) -> S {
        self.sort
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size.unwrap_or(self.fallback_page_size)
    }

    /// Whether `pageSize` was present and valid in the request.
    pub fn page_size_explicit(&self) -> bool {
        self.page_size.is_some()
    }

    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            page_size: self.page_size(),
        }
    }

    pub fn facets(&self) -> &F {
        &self.facets
    }
}

impl<S: SortField, F: Facets> Default for ListQuery<S, F> {
    fn default() -> Self {
        let sort = S::default();
        Self {
            search: None,
            sort,
            direction: sort.default_direction(),
            page: 1,
            page_size: None,
            fallback_page_size: PageSize::default(),
            facets: F::default(),
        }
    }
}
