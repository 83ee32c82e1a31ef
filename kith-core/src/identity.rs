//! Identity types for Kith entities
//!
//! Every persisted row has an internal `BIGSERIAL` key that never leaves the
//! server and an external UUID that is the only identifier clients see. The
//! newtypes below wrap those external UUIDs so a `FriendId` can never be
//! passed where a `CircleId` is expected.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;
use uuid::Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Calendar date without a time component (birthdays, encounter days).
pub type Date = NaiveDate;

/// Common behaviour of the typed external identifiers.
pub trait EntityIdType:
    Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Human-readable entity name used in error messages ("friend", "circle").
    const ENTITY_NAME: &'static str;

    /// Wrap a raw UUID.
    fn new(uuid: Uuid) -> Self;

    /// Unwrap to the raw UUID.
    fn as_uuid(&self) -> Uuid;

    /// Generate a fresh, timestamp-sortable identifier.
    fn now_v7() -> Self {
        Self::new(Uuid::now_v7())
    }
}

macro_rules! define_entity_id {
    ($(#[$meta:meta])* $name:ident => $entity:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl EntityIdType for $name {
            const ENTITY_NAME: &'static str = $entity;

            fn new(uuid: Uuid) -> Self {
                Self(uuid)
            }

            fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_entity_id!(
    /// Account owning every other record.
    UserId => "user"
);
define_entity_id!(
    /// Login session issued by the external session service.
    SessionId => "session"
);
define_entity_id!(
    /// Address-book entry.
    ContactId => "contact"
);
define_entity_id!(
    /// Contact the user actively keeps in touch with.
    FriendId => "friend"
);
define_entity_id!(CircleId => "circle");
define_entity_id!(CollectiveId => "collective");
define_entity_id!(
    /// Typed membership of a friend in a collective.
    MembershipId => "membership"
);
define_entity_id!(EncounterId => "encounter");
define_entity_id!(PlaceId => "place");

/// Parse any typed id from text, naming the entity in the error.
pub fn parse_id<T: EntityIdType>(raw: &str) -> Result<T, String> {
    Uuid::parse_str(raw.trim())
        .map(T::new)
        .map_err(|_| format!("must be a valid {} id (UUID)", T::ENTITY_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_as_bare_uuid() {
        let uuid = Uuid::now_v7();
        let id = FriendId::new(uuid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", uuid));

        let back: FriendId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_parse_id_names_entity() {
        let err = parse_id::<CircleId>("nope").unwrap_err();
        assert!(err.contains("circle"));

        let uuid = Uuid::now_v7();
        let parsed: CircleId = parse_id(&format!(" {} ", uuid)).unwrap();
        assert_eq!(parsed.as_uuid(), uuid);
    }

    #[test]
    fn test_from_str_rejects_garbage() {
        assert!("12345".parse::<EncounterId>().is_err());
        assert!(Uuid::nil().to_string().parse::<EncounterId>().is_ok());
    }
}
