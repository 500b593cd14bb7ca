//! Storage abstractions for events and registrations.
//!
//! Backends implement [`EventStore`] and [`RegistrationStore`] over the same
//! underlying data: admission needs the event and its registrations under a
//! single critical section, so the two traits are never implemented by
//! independent systems. [`Storage`] names the pair.
//!
//! # Atomic primitives
//!
//! - [`RegistrationStore::admit`]: read event, caller's confirmed
//!   registration and confirmed count, run [`crate::admission::decide`],
//!   insert. One unit per event.
//! - [`RegistrationStore::cancel`]: ownership check and status change,
//!   serialized with `admit` for the same event.
//! - [`EventStore::update_event`]: revision compare-and-set that also refuses
//!   a capacity below the confirmed count.
//! - [`EventStore::delete_event_cascade`]: event and all its registrations
//!   disappear together.
//!
//! # Implementations
//!
//! - `InMemoryStore` (in `eventgate-testing`): per-event mutex slots.
//! - `PostgresStore` (in `eventgate-postgres`): row-locking transactions.
//!
//! # Dyn Compatibility
//!
//! Methods return boxed futures instead of using `async fn` so the traits can
//! be used as `Arc<dyn Storage>`.

use crate::admission::AdmissionRequest;
use crate::error::StoreError;
use crate::event::{Event, LifecycleState};
use crate::registration::{CancelOutcome, Registration};
use crate::types::{EventId, RegistrationId, Revision, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by every store method.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Criteria for [`EventStore::find_events`]. Unset fields match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    /// Lifecycle state.
    pub state: Option<LifecycleState>,
    /// Exact calendar date.
    pub date: Option<NaiveDate>,
    /// Venue, compared case-insensitively.
    pub location: Option<String>,
    /// Category, compared case-insensitively.
    pub category: Option<String>,
    /// Owning user.
    pub organizer: Option<UserId>,
}

impl EventFilter {
    /// Only approved events.
    #[must_use]
    pub fn approved() -> Self {
        Self::default().with_state(LifecycleState::Approved)
    }

    /// Restrict to a lifecycle state.
    #[must_use]
    pub const fn with_state(mut self, state: LifecycleState) -> Self {
        self.state = Some(state);
        self
    }

    /// Restrict to a date.
    #[must_use]
    pub const fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Restrict to a venue.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Restrict to a category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Whether `event` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        self.state.is_none_or(|s| s == event.state)
            && self.date.is_none_or(|d| d == event.date)
            && self
                .location
                .as_deref()
                .is_none_or(|l| same_text(l, &event.location))
            && self.category.as_deref().is_none_or(|c| {
                event
                    .category
                    .as_deref()
                    .is_some_and(|ec| same_text(c, ec))
            })
            && self.organizer.is_none_or(|o| o == event.organizer)
    }
}

/// Case-insensitive, Unicode-aware comparison of a filter value against a
/// stored field. Postgres applies the same `lower()` folding.
fn same_text(wanted: &str, stored: &str) -> bool {
    wanted.trim().to_lowercase() == stored.to_lowercase()
}

/// Event counts by lifecycle state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTally {
    /// Awaiting review.
    pub pending: u64,
    /// Published.
    pub approved: u64,
    /// Turned down.
    pub rejected: u64,
}

impl EventTally {
    /// Count one more event in `state`.
    pub const fn record(&mut self, state: LifecycleState) {
        match state {
            LifecycleState::Pending => self.pending += 1,
            LifecycleState::Approved => self.approved += 1,
            LifecycleState::Rejected => self.rejected += 1,
        }
    }

    /// All events.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.pending + self.approved + self.rejected
    }
}

/// Registration counts by status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationTally {
    /// Holding a seat.
    pub confirmed: u64,
    /// Released.
    pub cancelled: u64,
}

impl RegistrationTally {
    /// All registrations.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.confirmed + self.cancelled
    }
}

/// Persistence of event records.
pub trait EventStore: Send + Sync {
    /// Store a new event.
    ///
    /// # Errors
    ///
    /// `Database` if the id already exists, `Unavailable` if the backend is down.
    fn insert_event(&self, event: Event) -> StoreFuture<'_, ()>;

    /// Load one event.
    ///
    /// # Errors
    ///
    /// Backend failures only; a missing event is `Ok(None)`.
    fn load_event(&self, id: EventId) -> StoreFuture<'_, Option<Event>>;

    /// Events matching `filter`, ordered by date then creation time.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    fn find_events(&self, filter: EventFilter) -> StoreFuture<'_, Vec<Event>>;

    /// Replace an event if its stored revision is still `expected`.
    ///
    /// `event.revision` is the new revision. The write is refused when it
    /// would put the capacity below the current confirmed count.
    ///
    /// # Errors
    ///
    /// - `VersionConflict` when the stored revision moved on.
    /// - `Rejected(NotFound)` when the event is gone.
    /// - `Rejected(Invalid)` when the capacity would drop below the count.
    fn update_event(&self, event: Event, expected: Revision) -> StoreFuture<'_, Event>;

    /// Remove an event and every registration for it, atomically.
    /// Returns how many registrations were removed.
    ///
    /// # Errors
    ///
    /// `Rejected(NotFound)` when the event does not exist.
    fn delete_event_cascade(&self, id: EventId) -> StoreFuture<'_, u64>;

    /// Events by lifecycle state.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    fn event_tally(&self) -> StoreFuture<'_, EventTally>;
}

/// Persistence of registrations, including the admission primitive.
pub trait RegistrationStore: Send + Sync {
    /// Atomically decide and, if admitted, insert a confirmed registration.
    ///
    /// # Errors
    ///
    /// - `Rejected(..)` with the first failing admission check.
    /// - `Serialization` when the database aborted the attempt; retryable.
    fn admit(&self, request: AdmissionRequest) -> StoreFuture<'_, Registration>;

    /// Cancel a registration on behalf of `requested_by`. Cancelling an
    /// already cancelled registration succeeds with `changed == false`.
    ///
    /// # Errors
    ///
    /// `Rejected(NotFound)` or `Rejected(Forbidden)`.
    fn cancel(
        &self,
        id: RegistrationId,
        requested_by: UserId,
        at: DateTime<Utc>,
    ) -> StoreFuture<'_, CancelOutcome>;

    /// Load one registration.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    fn load_registration(&self, id: RegistrationId) -> StoreFuture<'_, Option<Registration>>;

    /// Confirmed registrations for an event.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    fn count_confirmed(&self, event_id: EventId) -> StoreFuture<'_, u32>;

    /// Confirmed counts for several events at once. Missing events map to 0.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    fn confirmed_counts(&self, event_ids: Vec<EventId>) -> StoreFuture<'_, HashMap<EventId, u32>>;

    /// The user's confirmed registration for the event, if any.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    fn find_confirmed(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> StoreFuture<'_, Option<Registration>>;

    /// Every registration owned by the user, newest first.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    fn registrations_for_user(&self, user_id: UserId) -> StoreFuture<'_, Vec<Registration>>;

    /// Registrations by status.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    fn registration_tally(&self) -> StoreFuture<'_, RegistrationTally>;
}

/// A complete backend.
pub trait Storage: EventStore + RegistrationStore {
    /// Short backend name for logs and health reports.
    fn backend(&self) -> &'static str;

    /// Cheap round trip proving the backend is reachable.
    ///
    /// # Errors
    ///
    /// `Unavailable` when it is not.
    fn ping(&self) -> StoreFuture<'_, ()>;
}
