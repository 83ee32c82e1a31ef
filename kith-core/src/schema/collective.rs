//! Collective and membership shapes.

use super::{
    nullable, HasUpdates, Validate, Validator, MAX_DESCRIPTION_LEN, MAX_ITEMS, MAX_NAME_LEN,
    MAX_ROLE_LEN,
};
use crate::enums::CollectiveKind;
use crate::identity::{Date, FriendId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CollectiveInput {
    pub name: String,
    pub kind: CollectiveKind,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub archived: bool,
    /// Initial memberships created with the collective.
    #[serde(default)]
    pub memberships: Vec<MembershipInput>,
}

impl Validate for CollectiveInput {
    fn check(&self, v: &mut Validator) {
        v.required_text("name", &self.name, MAX_NAME_LEN);
        v.optional_text("description", self.description.as_deref(), MAX_DESCRIPTION_LEN);
        if self.memberships.len() > MAX_ITEMS {
            v.error("memberships", format!("must have at most {MAX_ITEMS} entries"));
            return;
        }
        let mut seen: Vec<FriendId> = Vec::with_capacity(self.memberships.len());
        for (i, m) in self.memberships.iter().enumerate() {
            v.nested(&format!("memberships[{i}]"), |v| {
                m.check(v);
                if seen.contains(&m.friend_id) {
                    v.error("friendId", "friend already listed");
                }
            });
            seen.push(m.friend_id);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CollectivePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<CollectiveKind>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
}

impl HasUpdates for CollectivePatch {
    fn has_any_updates(&self) -> bool {
        self.name.is_some()
            || self.kind.is_some()
            || self.description.is_some()
            || self.archived.is_some()
    }
}

impl Validate for CollectivePatch {
    fn check(&self, v: &mut Validator) {
        v.require_updates(self);
        if let Some(name) = &self.name {
            v.required_text("name", name, MAX_NAME_LEN);
        }
        v.optional_text(
            "description",
            self.description.as_ref().and_then(|d| d.as_deref()),
            MAX_DESCRIPTION_LEN,
        );
    }
}

/// Typed membership of a friend in a collective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MembershipInput {
    pub friend_id: FriendId,
    /// Free text; the collective's kind only suggests a vocabulary.
    pub role: String,
    #[serde(default)]
    pub since: Option<Date>,
}

impl Validate for MembershipInput {
    fn check(&self, v: &mut Validator) {
        v.required_text("role", &self.role, MAX_ROLE_LEN);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MembershipPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub since: Option<Option<Date>>,
}

impl HasUpdates for MembershipPatch {
    fn has_any_updates(&self) -> bool {
        self.role.is_some() || self.since.is_some()
    }
}

impl Validate for MembershipPatch {
    fn check(&self, v: &mut Validator) {
        v.require_updates(self);
        if let Some(role) = &self.role {
            v.required_text("role", role, MAX_ROLE_LEN);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::EntityIdType;

    fn membership(friend_id: FriendId, role: &str) -> MembershipInput {
        MembershipInput {
            friend_id,
            role: role.into(),
            since: None,
        }
    }

    #[test]
    fn test_duplicate_members_and_blank_roles() {
        let friend = FriendId::now_v7();
        let input = CollectiveInput {
            name: "The Lovelaces".into(),
            kind: CollectiveKind::Family,
            description: None,
            archived: false,
            memberships: vec![
                membership(friend, "parent"),
                membership(FriendId::now_v7(), " "),
                membership(friend, "child"),
            ],
        };
        let errors = input.validate().unwrap_err();
        assert!(errors.has("memberships[1].role"));
        assert!(errors.has("memberships[2].friendId"));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_role_length() {
        let long = "r".repeat(MAX_ROLE_LEN + 1);
        let errors = membership(FriendId::now_v7(), &long).validate().unwrap_err();
        assert!(errors.has("role"));
    }

    #[test]
    fn test_kind_must_be_known() {
        let json = r#"{"name":"x","kind":"tribe"}"#;
        assert!(serde_json::from_str::<CollectiveInput>(json).is_err());
    }

    #[test]
    fn test_membership_patch() {
        let patch: MembershipPatch = serde_json::from_str(r#"{"since":null}"#).unwrap();
        assert!(patch.validate().is_ok());
        assert!(MembershipPatch::default().validate().is_err());
    }
}
