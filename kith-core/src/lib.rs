//! Kith Core - Entity Types, Input Schemas and List Queries
//!
//! Pure data structures and pure functions shared by the API server, the
//! typed client and the test utilities. Nothing in this crate performs I/O.
//!
//! - [`identity`]: strongly-typed external identifiers
//! - [`entities`]: response shapes returned by the API
//! - [`schema`]: request shapes plus their compiled validators
//! - [`query`]: list-query parsing (search, facets, sort, pagination)

pub mod entities;
pub mod enums;
pub mod error;
pub mod identity;
pub mod query;
pub mod schema;

pub use entities::*;
pub use enums::*;
pub use error::{FieldError, ValidationErrors};
pub use identity::*;
pub use query::{
    escape_like, CollectiveFacets, CollectiveListQuery, CollectiveSort, ContactFacets,
    ContactListQuery, ContactSort, EncounterFacets, EncounterListQuery, EncounterSort,
    FriendFacets, FriendListQuery, FriendSort, ListQuery, PageSize, Pagination, QueryParams,
    SearchTerm, SortDirection, SortField,
};
pub use schema::{
    CircleInput, CirclePatch, CollectiveInput, CollectivePatch, ContactInput, ContactPatch,
    EncounterInput, EncounterPatch, FriendInput, FriendPatch, HasUpdates, MembershipInput,
    MembershipPatch, PreferencesPatch, Valid, Validate, Validator,
};
