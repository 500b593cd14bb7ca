//! Proptest strategies for domain types.

use chrono::NaiveDate;
use eventgate_core::event::{EventDraft, EventPatch};
use eventgate_core::types::{Actor, Role, UserId};
use proptest::prelude::*;

/// Seat limits small enough to exhaust in a test.
pub fn capacity() -> impl Strategy<Value = u32> {
    1u32..=16
}

/// Dates in 2025.
pub fn date() -> impl Strategy<Value = NaiveDate> {
    (1u32..=365).prop_filter_map("valid ordinal", |day| NaiveDate::from_yo_opt(2025, day))
}

/// Non-blank short text.
pub fn text() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9 ]{0,23}"
}

/// Drafts that pass validation.
pub fn draft() -> impl Strategy<Value = EventDraft> {
    (
        text(),
        proptest::option::of(text()),
        date(),
        text(),
        proptest::option::of(text()),
        capacity(),
    )
        .prop_map(|(title, description, date, location, category, capacity)| EventDraft {
            title,
            description,
            date,
            time: "19:00".to_string(),
            location,
            category,
            capacity,
        })
}

/// Non-empty patches that pass validation.
pub fn patch() -> impl Strategy<Value = EventPatch> {
    (
        proptest::option::of(text()),
        proptest::option::of(date()),
        proptest::option::of(text()),
        proptest::option::of(capacity()),
    )
        .prop_map(|(title, date, location, capacity)| EventPatch {
            title,
            date,
            location,
            capacity,
            ..EventPatch::default()
        })
        .prop_filter("patch must change something", |p| !p.is_empty())
}

/// A caller with either role.
pub fn actor() -> impl Strategy<Value = Actor> {
    prop_oneof![Just(Role::Member), Just(Role::Admin)].prop_map(|role| Actor {
        user_id: UserId::new(),
        role,
    })
}

/// Who arrives at the door: `users` distinct people, each appearing
/// between one and three times, shuffled.
pub fn arrivals(users: std::ops::RangeInclusive<usize>) -> impl Strategy<Value = Vec<usize>> {
    proptest::collection::vec(1usize..=3, users)
        .prop_map(|repeats| {
            repeats
                .into_iter()
                .enumerate()
                .flat_map(|(user, times)| std::iter::repeat_n(user, times))
                .collect::<Vec<_>>()
        })
        .prop_shuffle()
}

/// One step of a mixed register/cancel workload, naming a user by index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeatOp {
    /// The user asks for a seat.
    Register(usize),
    /// The user gives back the seat they hold, if any.
    Cancel(usize),
}

impl SeatOp {
    /// Index of the user performing the step.
    #[must_use]
    pub const fn user(self) -> usize {
        match self {
            Self::Register(user) | Self::Cancel(user) => user,
        }
    }
}

/// Interleaved registrations and cancellations by up to `users` people.
/// Registrations are more frequent so seats actually run out.
pub fn seat_ops(
    users: usize,
    steps: std::ops::RangeInclusive<usize>,
) -> impl Strategy<Value = Vec<SeatOp>> {
    let users = users.max(1);
    proptest::collection::vec(
        prop_oneof![
            3 => (0..users).prop_map(SeatOp::Register),
            2 => (0..users).prop_map(SeatOp::Cancel),
        ],
        steps,
    )
}
