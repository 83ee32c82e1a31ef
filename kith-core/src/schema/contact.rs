//! Contact create/update shapes.

use super::{
    nullable, HasUpdates, Validate, Validator, MAX_LABEL_LEN, MAX_NAME_LEN, MAX_NOTES_LEN,
    MAX_TEXT_LEN,
};
use crate::entities::{
    Address, ContactDetails, Email, Phone, Position, SignificantDate, SocialProfile, WebLink,
};
use crate::identity::Date;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContactInput {
    pub display_name: String,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub birthday: Option<Date>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub addresses: Vec<Address>,
    #[serde(default)]
    pub phones: Vec<Phone>,
    #[serde(default)]
    pub emails: Vec<Email>,
    #[serde(default)]
    pub urls: Vec<WebLink>,
    #[serde(default)]
    pub dates: Vec<SignificantDate>,
    #[serde(default)]
    pub social_profiles: Vec<SocialProfile>,
    #[serde(default)]
    pub professional_history: Vec<Position>,
}

impl ContactInput {
    /// Minimal input with only a display name.
    pub fn named(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            ..Default::default()
        }
    }

    pub fn details(&self) -> ContactDetails {
        ContactDetails {
            addresses: self.addresses.clone(),
            phones: self.phones.clone(),
            emails: self.emails.clone(),
            urls: self.urls.clone(),
            dates: self.dates.clone(),
            social_profiles: self.social_profiles.clone(),
            professional_history: self.professional_history.clone(),
        }
    }
}

impl Validate for ContactInput {
    fn check(&self, v: &mut Validator) {
        v.required_text("displayName", &self.display_name, MAX_NAME_LEN);
        check_names(
            v,
            self.given_name.as_deref(),
            self.family_name.as_deref(),
            self.nickname.as_deref(),
        );
        v.optional_text("notes", self.notes.as_deref(), MAX_NOTES_LEN);
        if let Some(url) = &self.photo_url {
            v.url("photoUrl", url);
        }
        check_addresses(v, &self.addresses);
        check_phones(v, &self.phones);
        check_emails(v, &self.emails);
        check_urls(v, &self.urls);
        check_dates(v, &self.dates);
        check_social(v, &self.social_profiles);
        check_history(v, &self.professional_history);
    }
}

/// Partial contact update. Supplied collections replace the stored ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContactPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub given_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub family_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub nickname: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub birthday: Option<Option<Date>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addresses: Option<Vec<Address>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phones: Option<Vec<Phone>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emails: Option<Vec<Email>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<Vec<WebLink>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dates: Option<Vec<SignificantDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_profiles: Option<Vec<SocialProfile>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub professional_history: Option<Vec<Position>>,
}

impl ContactPatch {
    /// Whether any scalar column changes.
    pub fn touches_columns(&self) -> bool {
        self.display_name.is_some()
            || self.given_name.is_some()
            || self.family_name.is_some()
            || self.nickname.is_some()
            || self.birthday.is_some()
            || self.notes.is_some()
            || self.photo_url.is_some()
            || self.archived.is_some()
    }
}

impl HasUpdates for ContactPatch {
    fn has_any_updates(&self) -> bool {
        self.touches_columns()
            || self.addresses.is_some()
            || self.phones.is_some()
            || self.emails.is_some()
            || self.urls.is_some()
            || self.dates.is_some()
            || self.social_profiles.is_some()
            || self.professional_history.is_some()
    }
}

impl Validate for ContactPatch {
    fn check(&self, v: &mut Validator) {
        v.require_updates(self);
        if let Some(name) = &self.display_name {
            v.required_text("displayName", name, MAX_NAME_LEN);
        }
        check_names(
            v,
            self.given_name.as_ref().and_then(|n| n.as_deref()),
            self.family_name.as_ref().and_then(|n| n.as_deref()),
            self.nickname.as_ref().and_then(|n| n.as_deref()),
        );
        v.optional_text(
            "notes",
            self.notes.as_ref().and_then(|n| n.as_deref()),
            MAX_NOTES_LEN,
        );
        if let Some(Some(url)) = &self.photo_url {
            v.url("photoUrl", url);
        }
        if let Some(items) = &self.addresses {
            check_addresses(v, items);
        }
        if let Some(items) = &self.phones {
            check_phones(v, items);
        }
        if let Some(items) = &self.emails {
            check_emails(v, items);
        }
        if let Some(items) = &self.urls {
            check_urls(v, items);
        }
        if let Some(items) = &self.dates {
            check_dates(v, items);
        }
        if let Some(items) = &self.social_profiles {
            check_social(v, items);
        }
        if let Some(items) = &self.professional_history {
            check_history(v, items);
        }
    }
}

// ============================================================================
// NESTED CHECKS
// ============================================================================

fn check_names(v: &mut Validator, given: Option<&str>, family: Option<&str>, nick: Option<&str>) {
    v.optional_text("givenName", given, MAX_NAME_LEN);
    v.optional_text("familyName", family, MAX_NAME_LEN);
    v.optional_text("nickname", nick, MAX_NAME_LEN);
}

fn check_addresses(v: &mut Validator, items: &[Address]) {
    v.each("addresses", items, |v, a| {
        v.optional_text("label", a.label.as_deref(), MAX_LABEL_LEN);
        v.optional_text("street", a.street.as_deref(), MAX_TEXT_LEN);
        v.optional_text("locality", a.locality.as_deref(), MAX_NAME_LEN);
        v.optional_text("region", a.region.as_deref(), MAX_NAME_LEN);
        v.optional_text("postalCode", a.postal_code.as_deref(), 32);
        if let Some(cc) = &a.country_code {
            v.country_code("countryCode", cc);
        }
        let empty = [&a.street, &a.locality, &a.region, &a.postal_code, &a.country_code]
            .iter()
            .all(|f| f.as_deref().map_or(true, |s| s.trim().is_empty()));
        if empty {
            v.error("", "address must have at least one populated field");
        }
    });
}

fn check_phones(v: &mut Validator, items: &[Phone]) {
    v.each("phones", items, |v, p| {
        v.optional_text("label", p.label.as_deref(), MAX_LABEL_LEN);
        v.phone("number", &p.number);
    });
}

fn check_emails(v: &mut Validator, items: &[Email]) {
    v.each("emails", items, |v, e| {
        v.optional_text("label", e.label.as_deref(), MAX_LABEL_LEN);
        v.email("address", &e.address);
    });
}

fn check_urls(v: &mut Validator, items: &[WebLink]) {
    v.each("urls", items, |v, u| {
        v.optional_text("label", u.label.as_deref(), MAX_LABEL_LEN);
        v.url("url", &u.url);
    });
}

fn check_dates(v: &mut Validator, items: &[SignificantDate]) {
    v.each("dates", items, |v, d| {
        v.optional_text("label", d.label.as_deref(), MAX_LABEL_LEN);
    });
}

fn check_social(v: &mut Validator, items: &[SocialProfile]) {
    v.each("socialProfiles", items, |v, s| {
        v.required_text("network", &s.network, MAX_LABEL_LEN);
        v.required_text("handle", &s.handle, MAX_NAME_LEN);
    });
}

fn check_history(v: &mut Validator, items: &[Position]) {
    v.each("professionalHistory", items, |v, p| {
        v.required_text("organization", &p.organization, MAX_NAME_LEN);
        v.optional_text("title", p.title.as_deref(), MAX_NAME_LEN);
        v.date_order("endedOn", p.started_on, p.ended_on);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_reports_every_nested_error() {
        let input = ContactInput {
            display_name: "".into(),
            emails: vec![
                Email {
                    label: None,
                    address: "a@example.com".into(),
                },
                Email {
                    label: None,
                    address: "b@example.com".into(),
                },
                Email {
                    label: None,
                    address: "not-an-email".into(),
                },
            ],
            urls: vec![WebLink {
                label: None,
                url: "mailto:x@example.com".into(),
            }],
            professional_history: vec![Position {
                organization: "Acme".into(),
                title: None,
                started_on: NaiveDate::from_ymd_opt(2020, 1, 1),
                ended_on: NaiveDate::from_ymd_opt(2019, 1, 1),
            }],
            ..Default::default()
        };

        let errors = input.validate().unwrap_err();
        assert!(errors.has("displayName"));
        assert!(errors.has("emails[2].address"));
        assert!(errors.has("urls[0].url"));
        assert!(errors.has("professionalHistory[0].endedOn"));
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_minimal_input_is_valid() {
        let valid = ContactInput::named("Grace Hopper").validate().unwrap();
        assert_eq!(valid.display_name, "Grace Hopper");
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = serde_json::from_str::<ContactInput>(r#"{"displayName":"x","shoeSize":9}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_patch_null_clears() {
        let patch: ContactPatch =
            serde_json::from_str(r#"{"nickname":null,"givenName":"Ada"}"#).unwrap();
        assert_eq!(patch.nickname, Some(None));
        assert_eq!(patch.given_name, Some(Some("Ada".into())));
        assert_eq!(patch.family_name, None);
        assert!(patch.validate().is_ok());
    }

    #[test]
    fn test_empty_patch_rejected() {
        let patch: ContactPatch = serde_json::from_str("{}").unwrap();
        let errors = patch.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_empty_address_rejected() {
        let input = ContactInput {
            addresses: vec![Address {
                label: Some("home".into()),
                ..Default::default()
            }],
            ..ContactInput::named("x")
        };
        assert!(input.validate().unwrap_err().has("addresses[0]"));
    }
}
