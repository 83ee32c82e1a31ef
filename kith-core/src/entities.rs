//! Response shapes returned by the Kith API.
//!
//! All shapes serialize as camelCase JSON. The nested contact detail types
//! (addresses, phones, ...) double as input types: they carry no identity of
//! their own and are always replaced as a whole collection.

use crate::enums::{CollectiveKind, DateKind};
use crate::identity::{
    CircleId, CollectiveId, ContactId, Date, EncounterId, FriendId, MembershipId, PlaceId,
    Timestamp, UserId,
};
use crate::query::{PageSize, Pagination};
use serde::{Deserialize, Serialize};

// ============================================================================
// USER
// ============================================================================

/// Per-user preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    /// Page size used by list endpoints when the request does not pick a valid one.
    pub default_page_size: Option<PageSize>,
}

/// The authenticated user's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub display_name: Option<String>,
    pub preferences: Preferences,
    pub created_at: Timestamp,
}

// ============================================================================
// CONTACT DETAILS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Address {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub locality: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    /// ISO-3166 alpha-2, upper case.
    #[serde(default)]
    pub country_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Phone {
    #[serde(default)]
    pub label: Option<String>,
    pub number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Email {
    #[serde(default)]
    pub label: Option<String>,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WebLink {
    #[serde(default)]
    pub label: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SignificantDate {
    pub kind: DateKind,
    #[serde(default)]
    pub label: Option<String>,
    pub date: Date,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SocialProfile {
    pub network: String,
    pub handle: String,
}

/// One entry of a contact's professional history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Position {
    pub organization: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub started_on: Option<Date>,
    #[serde(default)]
    pub ended_on: Option<Date>,
}

/// All nested collections of a contact, in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactDetails {
    pub addresses: Vec<Address>,
    pub phones: Vec<Phone>,
    pub emails: Vec<Email>,
    pub urls: Vec<WebLink>,
    pub dates: Vec<SignificantDate>,
    pub social_profiles: Vec<SocialProfile>,
    pub professional_history: Vec<Position>,
}

// ============================================================================
// CONTACT
// ============================================================================

/// Contact card without nested collections, used in lists and friend embeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSummary {
    pub id: ContactId,
    pub display_name: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub nickname: Option<String>,
    pub birthday: Option<Date>,
    pub photo_url: Option<String>,
    pub archived: bool,
    /// Whether a live friend is backed by this contact.
    pub is_friend: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Full contact with every nested collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[serde(flatten)]
    pub summary: ContactSummary,
    pub notes: Option<String>,
    #[serde(flatten)]
    pub details: ContactDetails,
}

// ============================================================================
// FRIENDS, CIRCLES, COLLECTIVES, ENCOUNTERS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Friend {
    pub id: FriendId,
    pub contact: ContactSummary,
    pub is_self: bool,
    pub favorite: bool,
    pub archived: bool,
    pub met_on: Option<Date>,
    pub met_context: Option<String>,
    pub notes: Option<String>,
    pub circle_ids: Vec<CircleId>,
    /// Date of the most recent encounter this friend took part in.
    pub last_encounter_on: Option<Date>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Circle {
    pub id: CircleId,
    pub name: String,
    pub color: Option<String>,
    pub description: Option<String>,
    pub member_count: i64,
    pub member_ids: Vec<FriendId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collective {
    pub id: CollectiveId,
    pub name: String,
    pub kind: CollectiveKind,
    pub description: Option<String>,
    pub archived: bool,
    pub member_count: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub id: MembershipId,
    pub collective_id: CollectiveId,
    pub friend_id: FriendId,
    /// Display name of the backing contact, for rendering without a second fetch.
    pub friend_name: String,
    pub role: String,
    pub since: Option<Date>,
    pub created_at: Timestamp,
}

/// Collective with its memberships and the role vocabulary for its kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectiveDetail {
    #[serde(flatten)]
    pub collective: Collective,
    pub memberships: Vec<Membership>,
    pub suggested_roles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Encounter {
    pub id: EncounterId,
    pub occurred_on: Date,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub friend_ids: Vec<FriendId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Reference place returned by the address lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub id: PlaceId,
    pub name: String,
    pub admin_area: Option<String>,
    pub country_code: String,
    pub postal_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

// ============================================================================
// PAGINATION
// ============================================================================

/// One page of a list response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub page_size: PageSize,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, pagination: Pagination) -> Self {
        let size = i64::from(pagination.page_size.get());
        let total = total.max(0);
        let total_pages = u32::try_from((total + size - 1) / size).unwrap_or(u32::MAX);
        Self {
            items,
            total,
            page: pagination.page,
            page_size: pagination.page_size,
            total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn pagination(page: u32, size: PageSize) -> Pagination {
        Pagination {
            page,
            page_size: size,
        }
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let page: Page<u8> = Page::new(vec![], 51, pagination(1, PageSize::TwentyFive));
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next());

        let empty: Page<u8> = Page::new(vec![], 0, pagination(1, PageSize::Ten));
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next());
    }

    #[test]
    fn test_page_json_shape() {
        let page = Page::new(vec![1, 2], 2, pagination(1, PageSize::Ten));
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "items": [1, 2],
                "total": 2,
                "page": 1,
                "pageSize": 10,
                "totalPages": 1
            })
        );
    }

    #[test]
    fn test_contact_flattens_details() {
        let now = Utc::now();
        let contact = Contact {
            summary: ContactSummary {
                id: ContactId::from(Uuid::now_v7()),
                display_name: "Ada".into(),
                given_name: None,
                family_name: None,
                nickname: None,
                birthday: None,
                photo_url: None,
                archived: false,
                is_friend: false,
                created_at: now,
                updated_at: now,
            },
            notes: None,
            details: ContactDetails {
                emails: vec![Email {
                    label: None,
                    address: "ada@example.com".into(),
                }],
                ..Default::default()
            },
        };
        let json = serde_json::to_value(&contact).unwrap();
        assert_eq!(json["displayName"], "Ada");
        assert_eq!(json["emails"][0]["address"], "ada@example.com");
        assert!(json["socialProfiles"].as_array().unwrap().is_empty());
    }
}
