//! Circle create/update shapes.

use super::{nullable, HasUpdates, Validate, Validator, MAX_DESCRIPTION_LEN, MAX_NAME_LEN};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CircleInput {
    pub name: String,
    /// `#rrggbb`
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Validate for CircleInput {
    fn check(&self, v: &mut Validator) {
        v.required_text("name", &self.name, MAX_NAME_LEN);
        if let Some(color) = &self.color {
            v.color("color", color);
        }
        v.optional_text("description", self.description.as_deref(), MAX_DESCRIPTION_LEN);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CirclePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub color: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
}

impl HasUpdates for CirclePatch {
    fn has_any_updates(&self) -> bool {
        self.name.is_some() || self.color.is_some() || self.description.is_some()
    }
}

impl Validate for CirclePatch {
    fn check(&self, v: &mut Validator) {
        v.require_updates(self);
        if let Some(name) = &self.name {
            v.required_text("name", name, MAX_NAME_LEN);
        }
        if let Some(Some(color)) = &self.color {
            v.color("color", color);
        }
        v.optional_text(
            "description",
            self.description.as_ref().and_then(|d| d.as_deref()),
            MAX_DESCRIPTION_LEN,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_input() {
        let input = CircleInput {
            name: "Climbing".into(),
            color: Some("#ff8800".into()),
            description: None,
        };
        assert!(input.validate().is_ok());

        let bad = CircleInput {
            name: "".into(),
            color: Some("orange".into()),
            description: None,
        };
        let errors = bad.validate().unwrap_err();
        assert!(errors.has("name"));
        assert!(errors.has("color"));
    }

    #[test]
    fn test_patch_can_clear_color() {
        let patch: CirclePatch = serde_json::from_str(r#"{"color":null}"#).unwrap();
        assert_eq!(patch.color, Some(None));
        assert!(patch.validate().is_ok());
    }
}
