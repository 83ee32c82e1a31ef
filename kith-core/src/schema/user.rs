//! User preference updates.

use super::{nullable, HasUpdates, Validate, Validator};
use crate::query::PageSize;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PreferencesPatch {
    /// `null` clears the preference; a number must be an allowed page size.
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub default_page_size: Option<Option<u16>>,
}

impl PreferencesPatch {
    /// The validated new preference, when one was supplied.
    pub fn page_size(&self) -> Option<Option<PageSize>> {
        self.default_page_size
            .map(|size| size.and_then(PageSize::from_u16))
    }
}

impl HasUpdates for PreferencesPatch {
    fn has_any_updates(&self) -> bool {
        self.default_page_size.is_some()
    }
}

impl Validate for PreferencesPatch {
    fn check(&self, v: &mut Validator) {
        v.require_updates(self);
        if let Some(Some(size)) = self.default_page_size {
            if PageSize::from_u16(size).is_none() {
                v.error("defaultPageSize", "must be one of 10, 25, 50, 100");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preferences_patch() {
        let set: PreferencesPatch = serde_json::from_str(r#"{"defaultPageSize":50}"#).unwrap();
        assert_eq!(set.validate().unwrap().page_size(), Some(Some(PageSize::Fifty)));

        let clear: PreferencesPatch = serde_json::from_str(r#"{"defaultPageSize":null}"#).unwrap();
        assert_eq!(clear.validate().unwrap().page_size(), Some(None));

        let bad: PreferencesPatch = serde_json::from_str(r#"{"defaultPageSize":30}"#).unwrap();
        assert!(bad.validate().unwrap_err().has("defaultPageSize"));
    }
}
