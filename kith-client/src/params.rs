//! List-request parameters.
//!
//! [`ListParams`] builds the query string a list endpoint parses. The sort
//! type parameter ties a builder to one entity, so only that entity's sort
//! fields and facets are offered.

use std::marker::PhantomData;

use kith_core::query::{facet_keys, keys};
use kith_core::{
    CircleId, CollectiveId, CollectiveKind, ContactSort, Date, EncounterSort, FriendId, FriendSort,
    CollectiveSort, PageSize, SortDirection, SortField,
};

pub type ContactParams = ListParams<ContactSort>;
pub type FriendParams = ListParams<FriendSort>;
pub type CollectiveParams = ListParams<CollectiveSort>;
pub type EncounterParams = ListParams<EncounterSort>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams<S> {
    pairs: Vec<(String, String)>,
    _sort: PhantomData<S>,
}

impl<S> Default for ListParams<S> {
    fn default() -> Self {
        Self {
            pairs: Vec::new(),
            _sort: PhantomData,
        }
    }
}

impl<S: SortField> ListParams<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(self, term: impl Into<String>) -> Self {
        self.set(keys::SEARCH, term.into())
    }

    pub fn sort(self, field: S) -> Self {
        self.set(keys::SORT, field.name().to_string())
    }

    pub fn direction(self, direction: SortDirection) -> Self {
        let raw = match direction {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        };
        self.set(keys::SORT_DIR, raw.to_string())
    }

    /// 1-based.
    pub fn page(self, page: u32) -> Self {
        self.set(keys::PAGE, page.to_string())
    }

    pub fn page_size(self, size: PageSize) -> Self {
        self.set(keys::PAGE_SIZE, size.get().to_string())
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Replace any earlier value for `key`.
    fn set(mut self, key: &str, value: String) -> Self {
        self.pairs.retain(|(k, _)| k != key);
        self.pairs.push((key.to_string(), value));
        self
    }

    /// Append another value for a repeatable key.
    fn push(mut self, key: &str, value: String) -> Self {
        self.pairs.push((key.to_string(), value));
        self
    }
}

impl ListParams<ContactSort> {
    pub fn archived(self, archived: bool) -> Self {
        self.set(facet_keys::ARCHIVED, archived.to_string())
    }

    pub fn is_friend(self, is_friend: bool) -> Self {
        self.set(facet_keys::IS_FRIEND, is_friend.to_string())
    }

    pub fn has_birthday(self, has_birthday: bool) -> Self {
        self.set(facet_keys::HAS_BIRTHDAY, has_birthday.to_string())
    }
}

impl ListParams<FriendSort> {
    /// Repeatable; a friend must be in every listed circle.
    pub fn circle(self, circle: CircleId) -> Self {
        self.push(facet_keys::CIRCLE, circle.to_string())
    }

    pub fn collective(self, collective: CollectiveId) -> Self {
        self.set(facet_keys::COLLECTIVE, collective.to_string())
    }

    pub fn favorite(self, favorite: bool) -> Self {
        self.set(facet_keys::FAVORITE, favorite.to_string())
    }

    pub fn archived(self, archived: bool) -> Self {
        self.set(facet_keys::ARCHIVED, archived.to_string())
    }

    pub fn is_self(self, is_self: bool) -> Self {
        self.set(facet_keys::IS_SELF, is_self.to_string())
    }
}

impl ListParams<CollectiveSort> {
    pub fn kind(self, kind: CollectiveKind) -> Self {
        self.set(facet_keys::KIND, kind.as_db_str().to_string())
    }

    pub fn member(self, friend: FriendId) -> Self {
        self.set(facet_keys::MEMBER, friend.to_string())
    }

    pub fn archived(self, archived: bool) -> Self {
        self.set(facet_keys::ARCHIVED, archived.to_string())
    }
}

impl ListParams<EncounterSort> {
    /// Repeatable; an encounter must include every listed friend.
    pub fn friend(self, friend: FriendId) -> Self {
        self.push(facet_keys::FRIEND, friend.to_string())
    }

    /// Inclusive.
    pub fn from(self, date: Date) -> Self {
        self.set(facet_keys::FROM, date.format("%Y-%m-%d").to_string())
    }

    /// Inclusive.
    pub fn to(self, date: Date) -> Self {
        self.set(facet_keys::TO, date.format("%Y-%m-%d").to_string())
    }
}
