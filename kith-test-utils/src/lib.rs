//! Kith Test Utilities
//!
//! Shared test infrastructure for the Kith workspace:
//! - Proptest generators for ids, query strings and inputs
//! - Fixtures for common request bodies
//! - A reference `ILIKE ... ESCAPE '\'` matcher for search-escaping properties
//! - Custom assertions over `ValidationErrors`

pub use kith_core::{
    Address, CircleId, CircleInput, CollectiveId, CollectiveInput, CollectiveKind, ContactId,
    ContactInput, Date, DateKind, Email, EncounterInput, EntityIdType, FriendId, FriendInput,
    MembershipInput, PageSize, Phone, Position, SignificantDate, SocialProfile, Timestamp,
    ValidationErrors, WebLink,
};

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for Kith types and raw query-string values.

    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use uuid::Uuid;

    /// Generate a random UUID.
    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    pub fn arb_friend_id() -> impl Strategy<Value = FriendId> {
        arb_uuid().prop_map(FriendId::new)
    }

    /// Generate a calendar date between 1950 and 2049.
    pub fn arb_date() -> impl Strategy<Value = Date> {
        (1950i32..2050, 1u32..=12, 1u32..=28)
            .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default())
    }

    /// Generate one of the allowed page sizes.
    pub fn arb_page_size() -> impl Strategy<Value = PageSize> {
        prop::sample::select(PageSize::ALL.to_vec())
    }

    /// Generate a raw `pageSize` value that is NOT one of the allowed sizes.
    pub fn arb_disallowed_page_size() -> impl Strategy<Value = String> {
        prop_oneof![
            any::<u32>()
                .prop_filter("allowed size", |n| ![10, 25, 50, 100].contains(n))
                .prop_map(|n| n.to_string()),
            any::<i32>().prop_filter("non-negative", |n| *n < 0).prop_map(|n| n.to_string()),
            "[a-zA-Z ]{0,8}",
            Just(String::new()),
            Just("25.0".to_string()),
        ]
    }

    /// Free text rich in LIKE metacharacters.
    pub fn arb_search_text() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9 %_\\\\.-]{1,24}"
    }

    /// Generate a display name that passes validation.
    pub fn arb_display_name() -> impl Strategy<Value = String> {
        "[A-Z][a-z]{1,12}( [A-Z][a-z]{1,12})?"
    }

    pub fn arb_email() -> impl Strategy<Value = Email> {
        ("[a-z]{1,10}", "[a-z]{1,10}", prop::option::of("(home|work)")).prop_map(
            |(user, host, label)| Email {
                label,
                address: format!("{user}@{host}.example"),
            },
        )
    }

    pub fn arb_phone() -> impl Strategy<Value = Phone> {
        "\\+[1-9][0-9]{6,12}".prop_map(|number| Phone {
            label: None,
            number,
        })
    }

    /// Generate a valid contact input with a few nested details.
    pub fn arb_contact_input() -> impl Strategy<Value = ContactInput> {
        (
            arb_display_name(),
            prop::option::of(arb_date()),
            prop::collection::vec(arb_email(), 0..4),
            prop::collection::vec(arb_phone(), 0..3),
            any::<bool>(),
        )
            .prop_map(|(display_name, birthday, emails, phones, archived)| ContactInput {
                display_name,
                birthday,
                emails,
                phones,
                archived,
                ..Default::default()
            })
    }

    pub fn arb_collective_kind() -> impl Strategy<Value = CollectiveKind> {
        prop::sample::select(CollectiveKind::ALL.to_vec())
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built inputs for common scenarios.

    use super::*;
    use chrono::NaiveDate;

    pub fn date(y: i32, m: u32, d: u32) -> Date {
        NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
    }

    /// A contact with one entry in every nested collection.
    pub fn full_contact(display_name: &str) -> ContactInput {
        ContactInput {
            display_name: display_name.to_string(),
            given_name: Some("Ada".to_string()),
            family_name: Some("Lovelace".to_string()),
            nickname: Some("Countess".to_string()),
            birthday: Some(date(1815, 12, 10)),
            notes: Some("Met at the analytical engine demo".to_string()),
            photo_url: None,
            archived: false,
            addresses: vec![Address {
                label: Some("home".to_string()),
                street: Some("12 St James's Square".to_string()),
                locality: Some("London".to_string()),
                region: None,
                postal_code: Some("SW1Y 4JH".to_string()),
                country_code: Some("GB".to_string()),
            }],
            phones: vec![Phone {
                label: Some("mobile".to_string()),
                number: "+44 20 7946 0000".to_string(),
            }],
            emails: vec![Email {
                label: Some("personal".to_string()),
                address: "ada@example.com".to_string(),
            }],
            urls: vec![WebLink {
                label: None,
                url: "https://example.com/ada".to_string(),
            }],
            dates: vec![SignificantDate {
                kind: DateKind::Anniversary,
                label: Some("wedding".to_string()),
                date: date(1835, 7, 8),
            }],
            social_profiles: vec![SocialProfile {
                network: "mastodon".to_string(),
                handle: "@ada@example.social".to_string(),
            }],
            professional_history: vec![Position {
                organization: "Analytical Society".to_string(),
                title: Some("Mathematician".to_string()),
                started_on: Some(date(1842, 1, 1)),
                ended_on: Some(date(1843, 9, 1)),
            }],
        }
    }

    /// Friend created together with a minimal inline contact.
    pub fn inline_friend(display_name: &str) -> FriendInput {
        FriendInput::with_contact(ContactInput::named(display_name))
    }

    pub fn circle(name: &str) -> CircleInput {
        CircleInput {
            name: name.to_string(),
            color: Some("#3b82f6".to_string()),
            description: None,
        }
    }

    pub fn collective(name: &str, kind: CollectiveKind, members: &[(FriendId, &str)]) -> CollectiveInput {
        CollectiveInput {
            name: name.to_string(),
            kind,
            description: None,
            archived: false,
            memberships: members
                .iter()
                .map(|(friend_id, role)| MembershipInput {
                    friend_id: *friend_id,
                    role: role.to_string(),
                    since: None,
                })
                .collect(),
        }
    }

    pub fn encounter(title: &str, occurred_on: Date, friends: &[FriendId]) -> EncounterInput {
        EncounterInput {
            occurred_on,
            title: title.to_string(),
            description: None,
            location: None,
            friend_ids: friends.to_vec(),
        }
    }

    /// JSON body with a field no input type accepts.
    pub fn body_with_unknown_field() -> serde_json::Value {
        serde_json::json!({ "displayName": "x", "favouriteColour": "teal" })
    }
}

// ============================================================================
// SQL LIKE REFERENCE MATCHER
// ============================================================================

pub mod like {
    //! Reference implementation of PostgreSQL `ILIKE pattern ESCAPE '\'`.

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Token {
        Literal(char),
        AnyOne,
        AnyMany,
    }

    fn tokenize(pattern: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut chars = pattern.chars();
        while let Some(c) = chars.next() {
            let token = match c {
                '\\' => Token::Literal(chars.next().unwrap_or('\\')),
                '%' => Token::AnyMany,
                '_' => Token::AnyOne,
                other => Token::Literal(other),
            };
            tokens.push(token);
        }
        tokens
    }

    fn fold(c: char) -> char {
        c.to_lowercase().next().unwrap_or(c)
    }

    /// Whether `text ILIKE pattern ESCAPE '\'` would be true.
    pub fn ilike(text: &str, pattern: &str) -> bool {
        let tokens = tokenize(pattern);
        let text: Vec<char> = text.chars().map(fold).collect();

        // dp[j]: tokens[..i] match text[..j]
        let mut dp = vec![false; text.len() + 1];
        dp[0] = true;
        for token in &tokens {
            let mut next = vec![false; text.len() + 1];
            match token {
                Token::AnyMany => {
                    let mut reachable = false;
                    for j in 0..=text.len() {
                        reachable |= dp[j];
                        next[j] = reachable;
                    }
                }
                Token::AnyOne => {
                    for j in 1..=text.len() {
                        next[j] = dp[j - 1];
                    }
                }
                Token::Literal(c) => {
                    let c = fold(*c);
                    for j in 1..=text.len() {
                        next[j] = dp[j - 1] && text[j - 1] == c;
                    }
                }
            }
            dp = next;
        }
        dp[text.len()]
    }

}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over validation results.

    use super::*;

    /// Assert that validation failed and reported `field`.
    #[track_caller]
    pub fn assert_field_error<T: std::fmt::Debug>(result: &Result<T, ValidationErrors>, field: &str) {
        match result {
            Err(errors) => assert!(
                errors.has(field),
                "Expected an error for {field}, got: {errors}"
            ),
            Ok(value) => panic!("Expected validation failure for {field}, got Ok: {value:?}"),
        }
    }

    /// Assert that validation failed with exactly these fields, in any order.
    #[track_caller]
    pub fn assert_error_fields<T: std::fmt::Debug>(
        result: &Result<T, ValidationErrors>,
        fields: &[&str],
    ) {
        match result {
            Err(errors) => {
                let mut got: Vec<&str> = errors.fields.iter().map(|f| f.field.as_str()).collect();
                let mut want = fields.to_vec();
                got.sort_unstable();
                want.sort_unstable();
                assert_eq!(got, want, "Unexpected error fields");
            }
            Ok(value) => panic!("Expected validation failure, got Ok: {value:?}"),
        }
    }
}
