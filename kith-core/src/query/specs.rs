//! Per-entity sort fields and facets.

use super::{bool_facet, date_facet, id_facet, id_list_facet, Facets, ListQuery, QueryParams, SortDirection, SortField};
use crate::enums::CollectiveKind;
use crate::error::ValidationErrors;
use crate::identity::{CircleId, CollectiveId, Date, FriendId};

/// Facet query-string keys, shared with the client's parameter builder.
pub mod facet_keys {
    pub const ARCHIVED: &str = "archived";
    pub const IS_FRIEND: &str = "isFriend";
    pub const HAS_BIRTHDAY: &str = "hasBirthday";
    pub const CIRCLE: &str = "circle";
    pub const COLLECTIVE: &str = "collective";
    pub const FAVORITE: &str = "favorite";
    pub const IS_SELF: &str = "isSelf";
    pub const KIND: &str = "kind";
    pub const MEMBER: &str = "member";
    pub const FRIEND: &str = "friend";
    pub const FROM: &str = "from";
    pub const TO: &str = "to";
}

use facet_keys as fk;

// ============================================================================
// CONTACTS
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContactSort {
    #[default]
    DisplayName,
    CreatedAt,
    UpdatedAt,
}

impl SortField for ContactSort {
    const ALLOWED: &'static [Self] = &[
        ContactSort::DisplayName,
        ContactSort::CreatedAt,
        ContactSort::UpdatedAt,
    ];

    fn name(&self) -> &'static str {
        match self {
            ContactSort::DisplayName => "displayName",
            ContactSort::CreatedAt => "createdAt",
            ContactSort::UpdatedAt => "updatedAt",
        }
    }

    fn default_direction(&self) -> SortDirection {
        match self {
            ContactSort::DisplayName => SortDirection::Asc,
            ContactSort::CreatedAt | ContactSort::UpdatedAt => SortDirection::Desc,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactFacets {
    pub archived: Option<bool>,
    pub is_friend: Option<bool>,
    pub has_birthday: Option<bool>,
}

impl Facets for ContactFacets {
    fn parse(params: &QueryParams, errors: &mut ValidationErrors) -> Self {
        Self {
            archived: bool_facet(params, fk::ARCHIVED, errors),
            is_friend: bool_facet(params, fk::IS_FRIEND, errors),
            has_birthday: bool_facet(params, fk::HAS_BIRTHDAY, errors),
        }
    }
}

pub type ContactListQuery = ListQuery<ContactSort, ContactFacets>;

// ============================================================================
// FRIENDS
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FriendSort {
    #[default]
    Name,
    CreatedAt,
    LastEncounter,
    MetOn,
}

impl SortField for FriendSort {
    const ALLOWED: &'static [Self] = &[
        FriendSort::Name,
        FriendSort::CreatedAt,
        FriendSort::LastEncounter,
        FriendSort::MetOn,
    ];

    fn name(&self) -> &'static str {
        match self {
            FriendSort::Name => "name",
            FriendSort::CreatedAt => "createdAt",
            FriendSort::LastEncounter => "lastEncounter",
            FriendSort::MetOn => "metOn",
        }
    }

    fn default_direction(&self) -> SortDirection {
        match self {
            FriendSort::Name => SortDirection::Asc,
            _ => SortDirection::Desc,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FriendFacets {
    /// Friend must be in every listed circle.
    pub circles: Vec<CircleId>,
    pub collective: Option<CollectiveId>,
    pub favorite: Option<bool>,
    pub archived: Option<bool>,
    pub is_self: Option<bool>,
}

impl Facets for FriendFacets {
    fn parse(params: &QueryParams, errors: &mut ValidationErrors) -> Self {
        Self {
            circles: id_list_facet(params, fk::CIRCLE, errors),
            collective: id_facet(params, fk::COLLECTIVE, errors),
            favorite: bool_facet(params, fk::FAVORITE, errors),
            archived: bool_facet(params, fk::ARCHIVED, errors),
            is_self: bool_facet(params, fk::IS_SELF, errors),
        }
    }
}

pub type FriendListQuery = ListQuery<FriendSort, FriendFacets>;

// ============================================================================
// COLLECTIVES
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CollectiveSort {
    #[default]
    Name,
    CreatedAt,
    MemberCount,
}

impl SortField for CollectiveSort {
    const ALLOWED: &'static [Self] = &[
        CollectiveSort::Name,
        CollectiveSort::CreatedAt,
        CollectiveSort::MemberCount,
    ];

    fn name(&self) -> &'static str {
        match self {
            CollectiveSort::Name => "name",
            CollectiveSort::CreatedAt => "createdAt",
            CollectiveSort::MemberCount => "memberCount",
        }
    }

    fn default_direction(&self) -> SortDirection {
        match self {
            CollectiveSort::Name => SortDirection::Asc,
            _ => SortDirection::Desc,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectiveFacets {
    pub kind: Option<CollectiveKind>,
    pub archived: Option<bool>,
    /// Only collectives this friend belongs to.
    pub member: Option<FriendId>,
}

impl Facets for CollectiveFacets {
    fn parse(params: &QueryParams, errors: &mut ValidationErrors) -> Self {
        let kind = params.first_non_blank(fk::KIND).and_then(|raw| {
            CollectiveKind::from_db_str(raw)
                .map_err(|_| {
                    errors.push(
                        fk::KIND,
                        "must be one of: family, company, club, household, other",
                    )
                })
                .ok()
        });
        Self {
            kind,
            archived: bool_facet(params, fk::ARCHIVED, errors),
            member: id_facet(params, fk::MEMBER, errors),
        }
    }
}

pub type CollectiveListQuery = ListQuery<CollectiveSort, CollectiveFacets>;

// ============================================================================
// ENCOUNTERS
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EncounterSort {
    #[default]
    OccurredOn,
    CreatedAt,
    Title,
}

impl SortField for EncounterSort {
    const ALLOWED: &'static [Self] = &[
        EncounterSort::OccurredOn,
        EncounterSort::CreatedAt,
        EncounterSort::Title,
    ];

    fn name(&self) -> &'static str {
        match self {
            EncounterSort::OccurredOn => "occurredOn",
            EncounterSort::CreatedAt => "createdAt",
            EncounterSort::Title => "title",
        }
    }

    fn default_direction(&self) -> SortDirection {
        match self {
            EncounterSort::Title => SortDirection::Asc,
            _ => SortDirection::Desc,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncounterFacets {
    /// Encounter must include every listed friend.
    pub friends: Vec<FriendId>,
    pub from: Option<Date>,
    pub to: Option<Date>,
}

impl EncounterFacets {
    /// Same facets with one more required participant, used by
    /// `/friends/{id}/encounters`.
    pub fn with_friend(mut self, friend: FriendId) -> Self {
        if !self.friends.contains(&friend) {
            self.friends.push(friend);
        }
        self
    }
}

impl Facets for EncounterFacets {
    fn parse(params: &QueryParams, errors: &mut ValidationErrors) -> Self {
        let friends = id_list_facet(params, fk::FRIEND, errors);
        let from = date_facet(params, fk::FROM, errors);
        let to = date_facet(params, fk::TO, errors);
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                errors.push(fk::TO, "must not be earlier than 'from'");
            }
        }
        Self { friends, from, to }
    }
}

pub type EncounterListQuery = ListQuery<EncounterSort, EncounterFacets>;

impl EncounterListQuery {
    /// Restrict the query to encounters that include `friend`.
    pub fn for_friend(mut self, friend: FriendId) -> Self {
        self.facets = std::mem::take(&mut self.facets).with_friend(friend);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_friend_facets_repeatable_circles() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let q = FriendListQuery::from_pairs([
            ("circle", a.to_string()),
            ("circle", b.to_string()),
            ("circle", a.to_string()),
            ("favorite", "TRUE".to_string()),
        ])
        .unwrap();

        let circles: Vec<Uuid> = q.facets().circles.iter().map(|c| Uuid::from(*c)).collect();
        assert_eq!(circles, vec![a, b]);
        assert_eq!(q.facets().favorite, Some(true));
        assert_eq!(q.facets().archived, None);
    }

    #[test]
    fn test_friend_facets_reject_bad_ids() {
        let errors = FriendListQuery::from_pairs([
            ("circle", "not-a-uuid"),
            ("collective", "also-not"),
        ])
        .unwrap_err();
        assert!(errors.has("circle"));
        assert!(errors.has("collective"));
    }

    #[test]
    fn test_friend_sort_names() {
        let q = FriendListQuery::from_pairs([("sort", "lastEncounter")]).unwrap();
        assert_eq!(q.sort(), FriendSort::LastEncounter);
        assert_eq!(q.direction(), SortDirection::Desc);

        let errors = FriendListQuery::from_pairs([("sort", "last_encounter")]).unwrap_err();
        assert!(errors.fields[0].message.contains("lastEncounter"));
    }

    #[test]
    fn test_collective_kind_facet() {
        let q = CollectiveListQuery::from_pairs([("kind", "Family")]).unwrap();
        assert_eq!(q.facets().kind, Some(CollectiveKind::Family));
        assert!(CollectiveListQuery::from_pairs([("kind", "tribe")]).is_err());
    }

    #[test]
    fn test_encounter_date_range() {
        let q = EncounterListQuery::from_pairs([("from", "2024-01-01"), ("to", "2024-12-31")])
            .unwrap();
        assert!(q.facets().from.is_some());
        assert_eq!(q.sort(), EncounterSort::OccurredOn);
        assert_eq!(q.direction(), SortDirection::Desc);

        let errors =
            EncounterListQuery::from_pairs([("from", "2024-12-31"), ("to", "2024-01-01")])
                .unwrap_err();
        assert!(errors.has("to"));

        let errors = EncounterListQuery::from_pairs([("from", "31/12/2024")]).unwrap_err();
        assert!(errors.has("from"));
    }

    #[test]
    fn test_for_friend_adds_participant_once() {
        let friend = FriendId::from(Uuid::now_v7());
        let q = EncounterListQuery::from_pairs([("friend", friend.to_string())])
            .unwrap()
            .for_friend(friend);
        assert_eq!(q.facets().friends, vec![friend]);
    }

    #[test]
    fn test_too_many_facet_values() {
        let pairs: Vec<(String, String)> = (0..=super::super::MAX_FACET_VALUES)
            .map(|_| ("friend".to_string(), Uuid::now_v7().to_string()))
            .collect();
        let errors = EncounterListQuery::from_pairs(pairs).unwrap_err();
        assert!(errors.has("friend"));
    }
}
