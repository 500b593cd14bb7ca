//! Ready-made events and drafts.

#![allow(clippy::expect_used)] // Fixtures use hardcoded valid values

use crate::mocks::test_clock;
use chrono::NaiveDate;
use eventgate_core::environment::Clock;
use eventgate_core::event::{Event, EventDraft, LifecycleState};
use eventgate_core::types::{EventId, UserId};

/// Date every fixture event takes place on: well after [`test_clock`].
#[must_use]
pub fn event_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 14).expect("hardcoded date is valid")
}

/// A valid draft with the given seat limit.
#[must_use]
pub fn draft(capacity: u32) -> EventDraft {
    EventDraft {
        title: "Rust meetup".to_string(),
        description: Some("Talks and pizza".to_string()),
        date: event_date(),
        time: "18:30".to_string(),
        location: "Hall A".to_string(),
        category: Some("Tech".to_string()),
        capacity,
    }
}

/// A pending event organized by `organizer`.
///
/// # Panics
///
/// Panics if `capacity` is zero.
#[must_use]
pub fn event_by(organizer: UserId, capacity: u32) -> Event {
    draft(capacity)
        .into_event(EventId::new(), organizer, test_clock().now())
        .expect("fixture draft is valid")
}

/// A pending event with a random organizer.
///
/// # Panics
///
/// Panics if `capacity` is zero.
#[must_use]
pub fn pending_event(capacity: u32) -> Event {
    event_by(UserId::new(), capacity)
}

/// An approved event with a random organizer, ready for admissions.
///
/// # Panics
///
/// Panics if `capacity` is zero.
#[must_use]
pub fn approved_event(capacity: u32) -> Event {
    with_state(pending_event(capacity), LifecycleState::Approved)
}

/// `event` moved to `state` without going through moderation.
#[must_use]
pub fn with_state(mut event: Event, state: LifecycleState) -> Event {
    event.state = state;
    event
}
