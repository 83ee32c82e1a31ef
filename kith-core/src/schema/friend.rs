//! Friend create/update shapes.

use super::{nullable, ContactInput, HasUpdates, Validate, Validator, MAX_NOTES_LEN, MAX_TEXT_LEN};
use crate::identity::{CircleId, ContactId, Date};
use serde::{Deserialize, Serialize};

/// New friend, backed either by an existing contact or by a contact created
/// in the same request. Exactly one of `contactId` / `contact` must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FriendInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<ContactId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<ContactInput>,
    #[serde(default)]
    pub is_self: bool,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub met_on: Option<Date>,
    #[serde(default)]
    pub met_context: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Circles to add the new friend to.
    #[serde(default)]
    pub circle_ids: Vec<CircleId>,
}

impl FriendInput {
    pub fn for_contact(contact_id: ContactId) -> Self {
        Self {
            contact_id: Some(contact_id),
            ..Default::default()
        }
    }

    pub fn with_contact(contact: ContactInput) -> Self {
        Self {
            contact: Some(contact),
            ..Default::default()
        }
    }
}

impl Validate for FriendInput {
    fn check(&self, v: &mut Validator) {
        match (&self.contact_id, &self.contact) {
            (Some(_), Some(_)) => v.error("contact", "provide either contactId or contact, not both"),
            (None, None) => v.error("contactId", "contactId or contact is required"),
            (None, Some(contact)) => v.nested("contact", |v| contact.check(v)),
            (Some(_), None) => {}
        }
        v.optional_text("metContext", self.met_context.as_deref(), MAX_TEXT_LEN);
        v.optional_text("notes", self.notes.as_deref(), MAX_NOTES_LEN);
        if self.circle_ids.len() > super::MAX_ITEMS {
            v.error("circleIds", format!("must have at most {} entries", super::MAX_ITEMS));
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FriendPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_self: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorite: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub met_on: Option<Option<Date>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub met_context: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

impl HasUpdates for FriendPatch {
    fn has_any_updates(&self) -> bool {
        self.is_self.is_some()
            || self.favorite.is_some()
            || self.archived.is_some()
            || self.met_on.is_some()
            || self.met_context.is_some()
            || self.notes.is_some()
    }
}

impl Validate for FriendPatch {
    fn check(&self, v: &mut Validator) {
        v.require_updates(self);
        v.optional_text(
            "metContext",
            self.met_context.as_ref().and_then(|c| c.as_deref()),
            MAX_TEXT_LEN,
        );
        v.optional_text(
            "notes",
            self.notes.as_ref().and_then(|n| n.as_deref()),
            MAX_NOTES_LEN,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::EntityIdType;

    #[test]
    fn test_requires_exactly_one_contact_source() {
        let errors = FriendInput::default().validate().unwrap_err();
        assert!(errors.has("contactId"));

        let both = FriendInput {
            contact_id: Some(ContactId::now_v7()),
            contact: Some(ContactInput::named("x")),
            ..Default::default()
        };
        assert!(both.validate().unwrap_err().has("contact"));

        assert!(FriendInput::for_contact(ContactId::now_v7()).validate().is_ok());
    }

    #[test]
    fn test_inline_contact_errors_are_prefixed() {
        let input = FriendInput::with_contact(ContactInput::named("   "));
        let errors = input.validate().unwrap_err();
        assert!(errors.has("contact.displayName"));
    }

    #[test]
    fn test_patch_requires_a_field() {
        assert!(FriendPatch::default().validate().is_err());
        let patch = FriendPatch {
            favorite: Some(true),
            ..Default::default()
        };
        assert!(patch.validate().is_ok());
    }
}
