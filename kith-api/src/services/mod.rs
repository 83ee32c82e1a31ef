//! Services
//!
//! One service per aggregate, each holding a pool handle. Services take the
//! resolved [`Owner`] first and scope every statement to it, so an id that
//! belongs to someone else behaves exactly like an id that does not exist.

pub mod address;
pub mod circles;
pub mod collectives;
pub mod contacts;
pub mod encounters;
pub mod friends;
pub mod users;

pub use address::{AddressQuery, AddressService};
pub use circles::CircleService;
pub use collectives::CollectiveService;
pub use contacts::ContactService;
pub use encounters::EncounterService;
pub use friends::FriendService;
pub use users::UserService;

use kith_core::{EntityIdType, PageSize, UserId};
use tokio_postgres::Row;
use uuid::Uuid;

use crate::error::ApiResult;

/// The authenticated caller, resolved to their internal row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner {
    /// `auth.users.id`; never leaves the server.
    pub id: i64,
    pub user_id: UserId,
    pub preferred_page_size: Option<PageSize>,
}

/// Typed external id from a UUID column.
pub(crate) fn ext_id<T: EntityIdType>(row: &Row, column: &str) -> ApiResult<T> {
    Ok(T::new(row.try_get::<_, Uuid>(column)?))
}

/// Typed external ids from a `uuid[]` column.
pub(crate) fn ext_ids<T: EntityIdType>(row: &Row, column: &str) -> ApiResult<Vec<T>> {
    let raw: Vec<Uuid> = row.try_get(column)?;
    Ok(raw.into_iter().map(T::new).collect())
}

/// Stored page-size preference; out-of-range values read as unset.
pub(crate) fn page_size_from_db(raw: Option<i16>) -> Option<PageSize> {
    raw.and_then(|n| u16::try_from(n).ok())
        .and_then(PageSize::from_u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_from_db() {
        assert_eq!(page_size_from_db(Some(50)), Some(PageSize::Fifty));
        assert_eq!(page_size_from_db(Some(30)), None);
        assert_eq!(page_size_from_db(Some(-10)), None);
        assert_eq!(page_size_from_db(None), None);
    }
}
