//! Moderation, edits and deletion through the desk.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use eventgate_core::environment::Clock;
use eventgate_core::error::Rejection;
use eventgate_core::event::{EventPatch, LifecycleState};
use eventgate_core::lifecycle::{self, LifecycleChange, LifecycleCommand};
use eventgate_core::store::{EventStore, RegistrationStore};
use eventgate_core::types::{Actor, EventId, Revision, UserId};
use eventgate_runtime::{DeskConfig, DeskEnvironment, DeskError, EventDesk, RetryPolicy};
use eventgate_testing::{FlakyStore, InMemoryStore, fixtures, properties, test_clock};
use futures::future::join_all;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

struct World {
    desk: EventDesk,
    store: InMemoryStore,
    organizer: Actor,
    admin: Actor,
}

fn world() -> World {
    let store = InMemoryStore::new();
    World {
        desk: EventDesk::new(
            Arc::new(store.clone()),
            DeskEnvironment::new(Arc::new(test_clock())),
            DeskConfig {
                retry: RetryPolicy::builder()
                    .max_retries(50)
                    .initial_delay(Duration::from_millis(1))
                    .max_delay(Duration::from_millis(10))
                    .build(),
            },
        ),
        store,
        organizer: Actor::member(UserId::new()),
        admin: Actor::admin(UserId::new()),
    }
}

fn rename(title: &str) -> EventPatch {
    EventPatch {
        title: Some(title.to_string()),
        ..EventPatch::default()
    }
}

fn rejection<T: std::fmt::Debug>(result: Result<T, DeskError>) -> Rejection {
    match result {
        Err(DeskError::Rejected(rejection)) => rejection,
        other => panic!("expected a rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn created_events_start_pending_and_need_approval() {
    let w = world();
    let event = w.desk.create_event(fixtures::draft(5), w.organizer).await.unwrap();
    assert_eq!(event.state, LifecycleState::Pending);
    assert_eq!(event.organizer, w.organizer.user_id);
    assert_eq!(event.revision, Revision::INITIAL);

    let err = w.desk.try_register(event.id, UserId::new(), None).await;
    assert!(matches!(rejection(err), Rejection::NotApproved { .. }));

    let approved = w.desk.approve(event.id, w.admin).await.unwrap();
    assert_eq!(approved.state, LifecycleState::Approved);
    assert_eq!(approved.revision, Revision::INITIAL.next());
    w.desk.try_register(event.id, UserId::new(), None).await.unwrap();
}

#[tokio::test]
async fn invalid_drafts_are_refused() {
    let w = world();
    let mut draft = fixtures::draft(5);
    draft.title = "   ".to_string();
    assert!(matches!(
        rejection(w.desk.create_event(draft, w.organizer).await),
        Rejection::Invalid(_)
    ));

    let err = w.desk.create_event(fixtures::draft(0), w.organizer).await;
    assert!(matches!(rejection(err), Rejection::Invalid(_)));
    assert_eq!(w.store.event_count(), 0);
}

#[tokio::test]
async fn only_moderators_approve_and_only_pending_events() {
    let w = world();
    let event = w.desk.create_event(fixtures::draft(5), w.organizer).await.unwrap();

    let err = w.desk.approve(event.id, w.organizer).await;
    assert!(matches!(rejection(err), Rejection::Forbidden { .. }));

    w.desk.reject(event.id, w.admin).await.unwrap();
    let err = w.desk.approve(event.id, w.admin).await;
    assert!(matches!(
        rejection(err),
        Rejection::InvalidTransition {
            from: LifecycleState::Rejected,
            action: "approve"
        }
    ));

    let err = w.desk.approve(EventId::new(), w.admin).await;
    assert!(matches!(rejection(err), Rejection::NotFound { .. }));
}

#[tokio::test]
async fn editing_an_approved_event_sends_it_back_to_review() {
    let w = world();
    let event = w.desk.create_event(fixtures::draft(5), w.organizer).await.unwrap();
    w.desk.approve(event.id, w.admin).await.unwrap();
    let attendee = UserId::new();
    w.desk.try_register(event.id, attendee, None).await.unwrap();

    let edited = w
        .desk
        .edit_event(event.id, rename("Rust meetup #2"), w.organizer)
        .await
        .unwrap();
    assert_eq!(edited.state, LifecycleState::Pending);
    assert_eq!(edited.title, "Rust meetup #2");

    // Existing seats survive; new admissions wait for re-approval.
    assert!(w.desk.is_registered(event.id, attendee).await.unwrap());
    let err = w.desk.try_register(event.id, UserId::new(), None).await;
    assert!(matches!(rejection(err), Rejection::NotApproved { .. }));
}

#[tokio::test]
async fn rejected_events_can_be_resubmitted() {
    let w = world();
    let event = w.desk.create_event(fixtures::draft(5), w.organizer).await.unwrap();
    w.desk.reject(event.id, w.admin).await.unwrap();

    let resubmitted = w
        .desk
        .edit_event(event.id, rename("Better title"), w.organizer)
        .await
        .unwrap();
    assert_eq!(resubmitted.state, LifecycleState::Pending);
    w.desk.approve(event.id, w.admin).await.unwrap();
}

#[tokio::test]
async fn edits_are_limited_to_the_organizer() {
    let w = world();
    let event = w.desk.create_event(fixtures::draft(5), w.organizer).await.unwrap();

    let err = w.desk.edit_event(event.id, rename("Mine now"), w.admin).await;
    assert!(matches!(rejection(err), Rejection::Forbidden { .. }));

    let err = w.desk.edit_event(event.id, EventPatch::default(), w.organizer).await;
    assert!(matches!(rejection(err), Rejection::Invalid(_)));
}

#[tokio::test]
async fn capacity_cannot_drop_below_confirmed_seats() {
    let w = world();
    let event = w.desk.create_event(fixtures::draft(5), w.organizer).await.unwrap();
    w.desk.approve(event.id, w.admin).await.unwrap();
    for _ in 0..3 {
        w.desk.try_register(event.id, UserId::new(), None).await.unwrap();
    }

    let shrink = |seats| EventPatch {
        capacity: Some(seats),
        ..EventPatch::default()
    };
    let err = w.desk.edit_event(event.id, shrink(2), w.organizer).await;
    assert!(matches!(rejection(err), Rejection::Invalid(_)));

    let edited = w.desk.edit_event(event.id, shrink(3), w.organizer).await.unwrap();
    assert_eq!(edited.capacity.get(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_edits_all_land_in_revision_order() {
    let w = world();
    let event = w.desk.create_event(fixtures::draft(5), w.organizer).await.unwrap();

    let edits = (0..8).map(|i| {
        let desk = w.desk.clone();
        let organizer = w.organizer;
        let event_id = event.id;
        tokio::spawn(async move {
            desk.edit_event(event_id, rename(&format!("Edit {i}")), organizer)
                .await
        })
    });
    let results = join_all(edits).await;
    assert!(results.iter().all(|r| matches!(r, Ok(Ok(_)))));

    let stored = w.store.load_event(event.id).await.unwrap().unwrap();
    assert_eq!(stored.revision, Revision::new(Revision::INITIAL.value() + 8));
}

#[tokio::test]
async fn delete_cascades_to_registrations() {
    let w = world();
    let event = w.desk.create_event(fixtures::draft(5), w.organizer).await.unwrap();
    w.desk.approve(event.id, w.admin).await.unwrap();
    let attendee = UserId::new();
    let registration = w.desk.try_register(event.id, attendee, None).await.unwrap();
    w.desk.try_register(event.id, UserId::new(), None).await.unwrap();

    let err = w.desk.delete_event(event.id, Actor::member(attendee)).await;
    assert!(matches!(rejection(err), Rejection::Forbidden { .. }));

    let deleted = w.desk.delete_event(event.id, w.organizer).await.unwrap();
    assert_eq!(deleted.registrations_removed, 2);
    assert!(w.store.load_registration(registration.id).await.unwrap().is_none());
    assert!(w.desk.user_registrations(attendee).await.unwrap().is_empty());

    let err = w.desk.try_register(event.id, attendee, None).await;
    assert!(matches!(rejection(err), Rejection::NotFound { .. }));
    let err = w.desk.cancel(registration.id, attendee).await;
    assert!(matches!(rejection(err), Rejection::NotFound { .. }));
}

#[tokio::test]
async fn stale_writes_retry_against_the_latest_revision() {
    let store = InMemoryStore::new();
    let flaky = FlakyStore::new(store.clone());
    let desk = EventDesk::new(
        Arc::new(flaky.clone()),
        DeskEnvironment::new(Arc::new(test_clock())),
        DeskConfig::default(),
    );
    let organizer = Actor::member(UserId::new());
    let event = desk.create_event(fixtures::draft(5), organizer).await.unwrap();

    flaky.abort_next(1);
    let edited = desk.edit_event(event.id, rename("After retry"), organizer).await.unwrap();
    assert_eq!(edited.title, "After retry");
    assert_eq!(flaky.write_attempts(), 2);
}

fn any_state() -> impl Strategy<Value = LifecycleState> {
    prop_oneof![
        Just(LifecycleState::Pending),
        Just(LifecycleState::Approved),
        Just(LifecycleState::Rejected),
    ]
}

proptest! {
    #[test]
    fn only_the_organizer_edits_and_edits_return_to_review(
        draft in properties::draft(),
        patch in properties::patch(),
        stranger in properties::actor(),
        state in any_state(),
    ) {
        let now = test_clock().now();
        let organizer = Actor::member(UserId::new());
        let mut event = draft.into_event(EventId::new(), organizer.user_id, now).unwrap();
        event.state = state;
        let edit = LifecycleCommand::Edit(patch);

        let refused = lifecycle::decide(&event, &stranger, &edit, now);
        prop_assert!(
            matches!(refused, Err(Rejection::Forbidden { .. })),
            "stranger edit gave {:?}",
            refused
        );

        let transition = lifecycle::decide(&event, &organizer, &edit, now).unwrap();
        prop_assert_eq!(transition.from, state);
        prop_assert_eq!(transition.event.state, LifecycleState::Pending);
        prop_assert_eq!(transition.event.revision, event.revision.next());
        prop_assert_eq!(transition.event.organizer, organizer.user_id);
        let expected = if state == LifecycleState::Pending {
            LifecycleChange::Edited
        } else {
            LifecycleChange::Resubmitted
        };
        prop_assert_eq!(transition.change, expected);
    }

    #[test]
    fn moderation_needs_an_admin_and_a_pending_event(
        draft in properties::draft(),
        actor in properties::actor(),
        state in any_state(),
        approve in any::<bool>(),
    ) {
        let now = test_clock().now();
        let mut event = draft.into_event(EventId::new(), UserId::new(), now).unwrap();
        event.state = state;
        let command = if approve { LifecycleCommand::Approve } else { LifecycleCommand::Reject };

        match lifecycle::decide(&event, &actor, &command, now) {
            Ok(transition) => {
                prop_assert!(actor.is_moderator());
                prop_assert_eq!(state, LifecycleState::Pending);
                let expected = if approve { LifecycleState::Approved } else { LifecycleState::Rejected };
                prop_assert_eq!(transition.event.state, expected);
            }
            Err(Rejection::Forbidden { .. }) => prop_assert!(!actor.is_moderator()),
            Err(Rejection::InvalidTransition { from, .. }) => {
                prop_assert!(actor.is_moderator());
                prop_assert_eq!(from, state);
                prop_assert_ne!(state, LifecycleState::Pending);
            }
            Err(other) => prop_assert!(false, "unexpected rejection {:?}", other),
        }
    }
}
