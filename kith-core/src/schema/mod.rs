//! Input Schemas
//!
//! One request type per create/update shape, each with a compiled validator.
//! Validation never stops at the first problem: a [`Validator`] walks the
//! whole input and records every failing field under a JSON-pointer-like path
//! (`emails[2].address`). A successful run yields [`Valid<T>`], which is the
//! only form the service layer accepts.
//!
//! Patch types use `Option<Option<T>>` for nullable columns: a missing key
//! leaves the column alone, `null` clears it, a value sets it.

mod circle;
mod collective;
mod contact;
mod encounter;
mod friend;
mod user;

pub use circle::{CircleInput, CirclePatch};
pub use collective::{CollectiveInput, CollectivePatch, MembershipInput, MembershipPatch};
pub use contact::{ContactInput, ContactPatch};
pub use encounter::{EncounterInput, EncounterPatch};
pub use friend::{FriendInput, FriendPatch};
pub use user::PreferencesPatch;

use crate::error::ValidationErrors;
use crate::identity::Date;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::ops::Deref;

// ============================================================================
// LIMITS
// ============================================================================

pub const MAX_NAME_LEN: usize = 200;
pub const MAX_LABEL_LEN: usize = 64;
pub const MAX_TEXT_LEN: usize = 500;
pub const MAX_DESCRIPTION_LEN: usize = 2_000;
pub const MAX_NOTES_LEN: usize = 10_000;
pub const MAX_URL_LEN: usize = 2_048;
pub const MAX_EMAIL_LEN: usize = 320;
pub const MAX_ROLE_LEN: usize = 64;
/// Most entries in any nested collection.
pub const MAX_ITEMS: usize = 50;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid email regex"));
static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^https?://[^\s/?#]+[^\s]*$").expect("Invalid url regex"));
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9][0-9 ().\-]{1,30}[0-9]$").expect("Invalid phone regex"));
static COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("Invalid color regex"));
static COUNTRY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2}$").expect("Invalid country regex"));

// ============================================================================
// VALID WRAPPER
// ============================================================================

/// Proof that a value passed its validator.
#[derive(Debug, Clone, PartialEq)]
pub struct Valid<T>(T);

impl<T> Valid<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Valid<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

/// Compiled validator for one input type.
pub trait Validate: Sized {
    /// Record every problem with `self` into `v`.
    fn check(&self, v: &mut Validator);

    fn validate(self) -> Result<Valid<Self>, ValidationErrors> {
        let mut v = Validator::new();
        self.check(&mut v);
        v.finish().map(|()| Valid(self))
    }
}

/// Implemented by patch types: at least one field must be set.
pub trait HasUpdates {
    fn has_any_updates(&self) -> bool;
}

// ============================================================================
// VALIDATOR
// ============================================================================

/// Error collector with a current path prefix.
#[derive(Debug, Default)]
pub struct Validator {
    prefix: String,
    errors: ValidationErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    fn path(&self, field: &str) -> String {
        match (self.prefix.is_empty(), field.is_empty()) {
            (true, _) => field.to_string(),
            (false, true) => self.prefix.clone(),
            (false, false) => format!("{}.{}", self.prefix, field),
        }
    }

    pub fn error(&mut self, field: &str, message: impl Into<String>) {
        let path = self.path(field);
        self.errors.push(path, message);
    }

    /// Run `f` with `segment` appended to the path.
    pub fn nested(&mut self, segment: &str, f: impl FnOnce(&mut Self)) {
        let saved = std::mem::take(&mut self.prefix);
        self.prefix = if saved.is_empty() {
            segment.to_string()
        } else {
            format!("{saved}.{segment}")
        };
        f(self);
        self.prefix = saved;
    }

    /// Validate every element of a nested collection under `field[i]`.
    pub fn each<T>(&mut self, field: &str, items: &[T], mut f: impl FnMut(&mut Self, &T)) {
        if items.len() > MAX_ITEMS {
            self.error(field, format!("must have at most {MAX_ITEMS} entries"));
            return;
        }
        for (i, item) in items.iter().enumerate() {
            self.nested(&format!("{field}[{i}]"), |v| f(v, item));
        }
    }

    pub fn required_text(&mut self, field: &str, value: &str, max: usize) {
        if value.trim().is_empty() {
            self.error(field, "is required");
        } else if value.chars().count() > max {
            self.error(field, format!("must be at most {max} characters"));
        }
    }

    pub fn optional_text(&mut self, field: &str, value: Option<&str>, max: usize) {
        if let Some(value) = value {
            if value.chars().count() > max {
                self.error(field, format!("must be at most {max} characters"));
            }
        }
    }

    pub fn email(&mut self, field: &str, value: &str) {
        if value.chars().count() > MAX_EMAIL_LEN || !EMAIL_RE.is_match(value.trim()) {
            self.error(field, "must be a valid email address");
        }
    }

    pub fn url(&mut self, field: &str, value: &str) {
        if value.len() > MAX_URL_LEN || !URL_RE.is_match(value.trim()) {
            self.error(field, "must be an http or https URL");
        }
    }

    pub fn phone(&mut self, field: &str, value: &str) {
        if !PHONE_RE.is_match(value.trim()) {
            self.error(field, "must be a phone number");
        }
    }

    pub fn color(&mut self, field: &str, value: &str) {
        if !COLOR_RE.is_match(value) {
            self.error(field, "must be a hex color like #3b82f6");
        }
    }

    pub fn country_code(&mut self, field: &str, value: &str) {
        if !COUNTRY_RE.is_match(value) {
            self.error(field, "must be an upper-case ISO-3166 alpha-2 code");
        }
    }

    /// `end` must not precede `start` when both are present.
    pub fn date_order(&mut self, end_field: &str, start: Option<Date>, end: Option<Date>) {
        if let (Some(start), Some(end)) = (start, end) {
            if end < start {
                self.error(end_field, "must not be earlier than the start date");
            }
        }
    }

    pub fn require_updates(&mut self, patch: &impl HasUpdates) {
        if !patch.has_any_updates() {
            self.error("", "at least one field must be provided");
        }
    }

    pub fn finish(self) -> Result<(), ValidationErrors> {
        self.errors.into_result(())
    }
}

// ============================================================================
// SERDE HELPERS
// ============================================================================

/// `#[serde(default, deserialize_with = "crate::schema::nullable")]`: turns a
/// present key into `Some(..)` even when its value is `null`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Trimmed value, `None` when blank.
pub fn normalize(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_paths() {
        let mut v = Validator::new();
        v.each("emails", &["ok@example.com", "nope"], |v, e| v.email("address", e));
        v.nested("contact", |v| v.required_text("displayName", " ", MAX_NAME_LEN));
        let errors = v.finish().unwrap_err();
        assert!(errors.has("emails[1].address"));
        assert!(errors.has("contact.displayName"));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_url_scheme() {
        let mut v = Validator::new();
        v.url("a", "https://example.com/x?y=1");
        v.url("b", "HTTP://example.com");
        assert!(v.finish().is_ok());

        let mut v = Validator::new();
        v.url("a", "javascript:alert(1)");
        v.url("b", "ftp://example.com");
        v.url("c", "https://");
        assert_eq!(v.finish().unwrap_err().len(), 3);
    }

    #[test]
    fn test_phone_color_country() {
        let mut v = Validator::new();
        v.phone("p", "+1 (555) 010-9999");
        v.color("c", "#A0b1C2");
        v.country_code("cc", "DE");
        assert!(v.finish().is_ok());

        let mut v = Validator::new();
        v.phone("p", "call me");
        v.color("c", "red");
        v.country_code("cc", "de");
        assert_eq!(v.finish().unwrap_err().len(), 3);
    }

    #[test]
    fn test_too_many_items() {
        let items = vec![0u8; MAX_ITEMS + 1];
        let mut v = Validator::new();
        v.each("phones", &items, |_, _| {});
        assert!(v.finish().unwrap_err().has("phones"));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Some("  x ")), Some("x".to_string()));
        assert_eq!(normalize(Some("   ")), None);
        assert_eq!(normalize(None), None);
    }
}
