//! Service tests against a real Postgres.
//!
//! Run with `--features db-tests` and `DATABASE_URL` (or `KITH_DB_*`) pointing
//! at a scratch database. Every test works under its own throwaway user.
#![cfg(feature = "db-tests")]

use kith_api::auth::AuthContext;
use kith_api::services::{
    CircleService, CollectiveService, ContactService, EncounterService, FriendService, UserService,
};
use kith_api::ErrorCode;
use kith_core::*;
use kith_test_utils::fixtures;

#[path = "support/db.rs"]
mod test_db_support;

use test_db_support::{fresh_owner, test_db};

fn valid<T: Validate + std::fmt::Debug>(input: T) -> Valid<T> {
    input.validate().unwrap()
}

// ============================================================================
// CONTACTS
// ============================================================================

#[tokio::test]
async fn test_contact_round_trip_keeps_details_in_order() {
    let db = test_db().await;
    let owner = fresh_owner(&db).await;
    let contacts = ContactService::new(db);

    let mut input = fixtures::full_contact("Ada Lovelace");
    input.phones.push(Phone {
        label: Some("work".to_string()),
        number: "+44 20 7946 0001".to_string(),
    });
    let created = contacts.create(&owner, valid(input.clone())).await.unwrap();

    let fetched = contacts.get(&owner, created.id).await.unwrap();
    assert_eq!(fetched.summary.display_name, "Ada Lovelace");
    assert_eq!(fetched.details.phones, input.phones);
    assert_eq!(fetched.details.emails, input.emails);
    assert!(!fetched.summary.is_friend);
}

#[tokio::test]
async fn test_search_matches_wildcards_literally() {
    let db = test_db().await;
    let owner = fresh_owner(&db).await;
    let contacts = ContactService::new(db);

    contacts.create(&owner, valid(ContactInput::named("100% Real"))).await.unwrap();
    contacts.create(&owner, valid(ContactInput::named("1000 Real"))).await.unwrap();

    let query = ContactListQuery::from_pairs([("search", "100%")]).unwrap();
    let page = contacts.list(&owner, query).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].display_name, "100% Real");
}

#[tokio::test]
async fn test_pages_are_slices_of_the_full_order() {
    let db = test_db().await;
    let owner = fresh_owner(&db).await;
    let contacts = ContactService::new(db);

    for i in 0..23 {
        contacts
            .create(&owner, valid(ContactInput::named(format!("Person {:02}", i))))
            .await
            .unwrap();
    }

    let all = contacts
        .list(&owner, ContactListQuery::from_pairs([("pageSize", "100")]).unwrap())
        .await
        .unwrap();
    assert_eq!(all.total, 23);

    let page2 = contacts
        .list(&owner, ContactListQuery::from_pairs([("pageSize", "10"), ("page", "2")]).unwrap())
        .await
        .unwrap();
    assert_eq!(page2.total, 23);
    assert_eq!(page2.total_pages, 3);
    let expected: Vec<ContactId> = all.items[10..20].iter().map(|c| c.id).collect();
    let actual: Vec<ContactId> = page2.items.iter().map(|c| c.id).collect();
    assert_eq!(actual, expected);
}

#[tokio::test]
async fn test_contact_backing_a_friend_cannot_be_deleted() {
    let db = test_db().await;
    let owner = fresh_owner(&db).await;
    let contacts = ContactService::new(db.clone());
    let friends = FriendService::new(db);

    let friend = friends
        .create(&owner, valid(fixtures::inline_friend("Grace Hopper")))
        .await
        .unwrap();
    let err = contacts.delete(&owner, friend.contact.id).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::Conflict);

    friends.delete(&owner, friend.id).await.unwrap();
    contacts.delete(&owner, friend.contact.id).await.unwrap();
    let err = contacts.get(&owner, friend.contact.id).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
}

// ============================================================================
// FRIENDS
// ============================================================================

#[tokio::test]
async fn test_duplicate_friend_for_contact_conflicts() {
    let db = test_db().await;
    let owner = fresh_owner(&db).await;
    let friends = FriendService::new(db);

    let first = friends
        .create(&owner, valid(fixtures::inline_friend("Alan Turing")))
        .await
        .unwrap();

    let again = FriendInput {
        contact_id: Some(first.contact.id),
        favorite: true,
        ..Default::default()
    };
    let err = friends.create(&owner, valid(again)).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::Conflict);

    let unchanged = friends.get(&owner, first.id).await.unwrap();
    assert!(!unchanged.favorite);
}

#[tokio::test]
async fn test_foreign_friend_is_not_found() {
    let db = test_db().await;
    let alice = fresh_owner(&db).await;
    let mallory = fresh_owner(&db).await;
    let friends = FriendService::new(db);

    let friend = friends
        .create(&alice, valid(fixtures::inline_friend("Alice's friend")))
        .await
        .unwrap();

    let err = friends.get(&mallory, friend.id).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
    let err = friends.delete(&mallory, friend.id).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
    assert!(friends.get(&alice, friend.id).await.is_ok());
}

#[tokio::test]
async fn test_unknown_page_size_falls_back() {
    let db = test_db().await;
    let owner = fresh_owner(&db).await;
    let friends = FriendService::new(db);

    let query = FriendListQuery::from_pairs([("pageSize", "999")]).unwrap();
    let page = friends.list(&owner, query).await.unwrap();
    assert_eq!(page.page_size, PageSize::TwentyFive);
}

#[tokio::test]
async fn test_friend_filters_by_circle() {
    let db = test_db().await;
    let owner = fresh_owner(&db).await;
    let friends = FriendService::new(db.clone());
    let circles = CircleService::new(db);

    let climbing = circles.create(&owner, valid(fixtures::circle("Climbing"))).await.unwrap();
    let mut input = fixtures::inline_friend("Climber");
    input.circle_ids = vec![climbing.id];
    let climber = friends.create(&owner, valid(input)).await.unwrap();
    friends
        .create(&owner, valid(fixtures::inline_friend("Couch potato")))
        .await
        .unwrap();

    let query = FriendListQuery::from_pairs([("circle", climbing.id.to_string())]).unwrap();
    let page = friends.list(&owner, query).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, climber.id);
    assert_eq!(page.items[0].circle_ids, vec![climbing.id]);
}

// ============================================================================
// CIRCLES
// ============================================================================

#[tokio::test]
async fn test_duplicate_circle_name_conflicts() {
    let db = test_db().await;
    let owner = fresh_owner(&db).await;
    let circles = CircleService::new(db);

    circles.create(&owner, valid(fixtures::circle("Book club"))).await.unwrap();
    let err = circles
        .create(&owner, valid(fixtures::circle("Book club")))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::Conflict);
    assert_eq!(circles.list(&owner).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_circle_membership_is_idempotent() {
    let db = test_db().await;
    let owner = fresh_owner(&db).await;
    let friends = FriendService::new(db.clone());
    let circles = CircleService::new(db);

    let circle = circles.create(&owner, valid(fixtures::circle("Neighbours"))).await.unwrap();
    let friend = friends
        .create(&owner, valid(fixtures::inline_friend("Next door")))
        .await
        .unwrap();

    circles.add_member(&owner, circle.id, friend.id).await.unwrap();
    let circle = circles.add_member(&owner, circle.id, friend.id).await.unwrap();
    assert_eq!(circle.member_count, 1);

    let circle = circles.remove_member(&owner, circle.id, friend.id).await.unwrap();
    assert_eq!(circle.member_count, 0);
    let err = circles.remove_member(&owner, circle.id, friend.id).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
}

// ============================================================================
// COLLECTIVES AND ENCOUNTERS
// ============================================================================

#[tokio::test]
async fn test_collective_memberships() {
    let db = test_db().await;
    let owner = fresh_owner(&db).await;
    let friends = FriendService::new(db.clone());
    let collectives = CollectiveService::new(db);

    let parent = friends.create(&owner, valid(fixtures::inline_friend("Mum"))).await.unwrap();
    let child = friends.create(&owner, valid(fixtures::inline_friend("Kid"))).await.unwrap();

    let family = collectives
        .create(
            &owner,
            valid(fixtures::collective("The Smiths", CollectiveKind::Family, &[(parent.id, "parent")])),
        )
        .await
        .unwrap();
    assert_eq!(family.collective.member_count, 1);
    assert!(!family.suggested_roles.is_empty());

    let membership = collectives
        .add_membership(
            &owner,
            family.collective.id,
            valid(MembershipInput {
                friend_id: child.id,
                role: "child".to_string(),
                since: None,
            }),
        )
        .await
        .unwrap();
    assert_eq!(membership.friend_name, "Kid");

    let err = collectives
        .add_membership(
            &owner,
            family.collective.id,
            valid(MembershipInput {
                friend_id: child.id,
                role: "sibling".to_string(),
                since: None,
            }),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::Conflict);

    let query = CollectiveListQuery::from_pairs([("member", child.id.to_string())]).unwrap();
    let page = collectives.list(&owner, query).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].member_count, 2);
}

#[tokio::test]
async fn test_encounters_for_friend_and_participant_replacement() {
    let db = test_db().await;
    let owner = fresh_owner(&db).await;
    let friends = FriendService::new(db.clone());
    let encounters = EncounterService::new(db);

    let a = friends.create(&owner, valid(fixtures::inline_friend("A"))).await.unwrap();
    let b = friends.create(&owner, valid(fixtures::inline_friend("B"))).await.unwrap();

    let lunch = encounters
        .create(
            &owner,
            valid(fixtures::encounter("Lunch", fixtures::date(2024, 3, 1), &[a.id, b.id])),
        )
        .await
        .unwrap();
    encounters
        .create(&owner, valid(fixtures::encounter("Call", fixtures::date(2024, 3, 2), &[b.id])))
        .await
        .unwrap();

    let query = EncounterListQuery::from_pairs(Vec::<(String, String)>::new())
        .unwrap()
        .for_friend(a.id);
    let page = encounters.list(&owner, query).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, lunch.id);

    let patch = EncounterPatch {
        friend_ids: Some(vec![b.id]),
        ..Default::default()
    };
    let updated = encounters.update(&owner, lunch.id, valid(patch)).await.unwrap();
    assert_eq!(updated.friend_ids, vec![b.id]);

    let a = friends.get(&owner, a.id).await.unwrap();
    assert_eq!(a.last_encounter_on, None);
}

// ============================================================================
// USERS
// ============================================================================

#[tokio::test]
async fn test_disabled_account_is_forbidden() {
    let db = test_db().await;
    let owner = fresh_owner(&db).await;
    let users = UserService::new(db.clone());
    let auth = AuthContext { user_id: owner.user_id, session_id: None };

    let conn = db.get_conn().await.unwrap();
    conn.execute("UPDATE auth.users SET disabled_at = now() WHERE id = $1", &[&owner.id])
        .await
        .unwrap();
    let err = users.owner(&auth).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::Forbidden);

    conn.execute("UPDATE auth.users SET disabled_at = NULL WHERE id = $1", &[&owner.id])
        .await
        .unwrap();
    assert_eq!(users.owner(&auth).await.unwrap().id, owner.id);
}
