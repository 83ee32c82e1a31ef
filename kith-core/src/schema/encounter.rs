//! Encounter create/update shapes.

use super::{
    nullable, HasUpdates, Validate, Validator, MAX_DESCRIPTION_LEN, MAX_ITEMS, MAX_NAME_LEN,
    MAX_TEXT_LEN,
};
use crate::identity::{Date, FriendId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EncounterInput {
    pub occurred_on: Date,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub friend_ids: Vec<FriendId>,
}

impl Validate for EncounterInput {
    fn check(&self, v: &mut Validator) {
        v.required_text("title", &self.title, MAX_NAME_LEN);
        v.optional_text("description", self.description.as_deref(), MAX_DESCRIPTION_LEN);
        v.optional_text("location", self.location.as_deref(), MAX_TEXT_LEN);
        check_participants(v, &self.friend_ids);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EncounterPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurred_on: Option<Date>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub location: Option<Option<String>>,
    /// Replaces the participant set when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friend_ids: Option<Vec<FriendId>>,
}

impl HasUpdates for EncounterPatch {
    fn has_any_updates(&self) -> bool {
        self.occurred_on.is_some()
            || self.title.is_some()
            || self.description.is_some()
            || self.location.is_some()
            || self.friend_ids.is_some()
    }
}

impl Validate for EncounterPatch {
    fn check(&self, v: &mut Validator) {
        v.require_updates(self);
        if let Some(title) = &self.title {
            v.required_text("title", title, MAX_NAME_LEN);
        }
        v.optional_text(
            "description",
            self.description.as_ref().and_then(|d| d.as_deref()),
            MAX_DESCRIPTION_LEN,
        );
        v.optional_text(
            "location",
            self.location.as_ref().and_then(|l| l.as_deref()),
            MAX_TEXT_LEN,
        );
        if let Some(ids) = &self.friend_ids {
            check_participants(v, ids);
        }
    }
}

fn check_participants(v: &mut Validator, ids: &[FriendId]) {
    if ids.is_empty() {
        v.error("friendIds", "must include at least one friend");
    } else if ids.len() > MAX_ITEMS {
        v.error("friendIds", format!("must have at most {MAX_ITEMS} entries"));
    } else {
        for (i, id) in ids.iter().enumerate() {
            if ids[..i].contains(id) {
                v.error(&format!("friendIds[{i}]"), "friend already listed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::EntityIdType;
    use chrono::NaiveDate;

    fn day() -> Date {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn test_requires_participant() {
        let input = EncounterInput {
            occurred_on: day(),
            title: "Dinner".into(),
            description: None,
            location: None,
            friend_ids: vec![],
        };
        assert!(input.validate().unwrap_err().has("friendIds"));
    }

    #[test]
    fn test_duplicate_participant() {
        let f = FriendId::now_v7();
        let input = EncounterInput {
            occurred_on: day(),
            title: "Dinner".into(),
            description: None,
            location: Some("Lisbon".into()),
            friend_ids: vec![f, FriendId::now_v7(), f],
        };
        assert!(input.validate().unwrap_err().has("friendIds[2]"));
    }

    #[test]
    fn test_patch_empty_participants_rejected() {
        let patch = EncounterPatch {
            friend_ids: Some(vec![]),
            ..Default::default()
        };
        assert!(patch.validate().unwrap_err().has("friendIds"));
    }
}
