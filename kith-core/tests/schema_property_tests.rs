//! Property-Based Tests for Input Validation
//!
//! **Well-formed inputs pass**: generated contacts with plausible names,
//! emails and phones always validate.
//!
//! **Errors point at the item**: breaking one nested entry reports exactly
//! that entry's path and nothing else.

use kith_core::{CollectiveKind, ContactInput, Validate};
use kith_test_utils::assertions::{assert_error_fields, assert_field_error};
use kith_test_utils::generators::*;
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_generated_contacts_validate(input in arb_contact_input()) {
        let result = input.validate();
        prop_assert!(result.is_ok(), "unexpected errors: {:?}", result.err());
    }

    #[test]
    fn prop_bad_email_reports_its_index(
        mut input in arb_contact_input(),
        extra in arb_email(),
        pick in any::<prop::sample::Index>(),
    ) {
        input.emails.push(extra);
        let i = pick.index(input.emails.len());
        input.emails[i].address = "not-an-address".to_string();

        let field = format!("emails[{i}].address");
        assert_error_fields(&input.validate(), &[field.as_str()]);
    }

    #[test]
    fn prop_collective_kind_parses_any_case(kind in arb_collective_kind()) {
        let shouted = kind.as_db_str().to_uppercase();
        prop_assert_eq!(CollectiveKind::from_db_str(&shouted), Ok(kind));
        prop_assert!(!kind.suggested_roles().is_empty());
    }
}

#[test]
fn test_blank_display_name_is_reported() {
    assert_field_error(&ContactInput::named("   ").validate(), "displayName");
}

#[test]
fn test_blank_name_and_bad_phone_are_both_reported() {
    let mut input = ContactInput::named("");
    input.phones.push(kith_core::Phone {
        label: None,
        number: "call me".to_string(),
    });
    assert_error_fields(&input.validate(), &["displayName", "phones[0].number"]);
}
