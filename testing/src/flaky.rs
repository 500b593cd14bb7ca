//! Fault injection around [`InMemoryStore`].

use crate::memory::InMemoryStore;
use chrono::{DateTime, Utc};
use eventgate_core::admission::AdmissionRequest;
use eventgate_core::error::StoreError;
use eventgate_core::event::Event;
use eventgate_core::registration::{CancelOutcome, Registration};
use eventgate_core::store::{
    EventFilter, EventStore, EventTally, RegistrationStore, RegistrationTally, Storage, StoreFuture,
};
use eventgate_core::types::{EventId, RegistrationId, Revision, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Wraps an [`InMemoryStore`] and fails on demand.
///
/// - [`Self::go_down`] makes every call return `Unavailable` until
///   [`Self::recover`].
/// - [`Self::abort_next`] makes the next `n` writes (`admit`,
///   `update_event`, `cancel`) fail with a retryable `Serialization` error
///   without touching the data.
#[derive(Clone, Debug, Default)]
pub struct FlakyStore {
    inner: InMemoryStore,
    down: Arc<AtomicBool>,
    aborts: Arc<AtomicUsize>,
    attempts: Arc<AtomicUsize>,
}

impl FlakyStore {
    /// Wrap `inner`.
    #[must_use]
    pub fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    /// The wrapped store, for seeding and inspection.
    #[must_use]
    pub const fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    /// Fail every call from now on.
    pub fn go_down(&self) {
        self.down.store(true, Ordering::SeqCst);
    }

    /// Stop failing.
    pub fn recover(&self) {
        self.down.store(false, Ordering::SeqCst);
    }

    /// Abort the next `n` writes with a retryable error.
    pub fn abort_next(&self, n: usize) {
        self.aborts.store(n, Ordering::SeqCst);
    }

    /// How many writes reached this wrapper, aborted or not.
    #[must_use]
    pub fn write_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn check_up(&self) -> Result<(), StoreError> {
        if self.down.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }

    fn check_write(&self) -> Result<(), StoreError> {
        self.check_up()?;
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let aborted = self
            .aborts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if aborted {
            Err(StoreError::Serialization(
                "could not serialize access due to concurrent update".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

impl EventStore for FlakyStore {
    fn insert_event(&self, event: Event) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.check_up()?;
            self.inner.insert_event(event).await
        })
    }

    fn load_event(&self, id: EventId) -> StoreFuture<'_, Option<Event>> {
        Box::pin(async move {
            self.check_up()?;
            self.inner.load_event(id).await
        })
    }

    fn find_events(&self, filter: EventFilter) -> StoreFuture<'_, Vec<Event>> {
        Box::pin(async move {
            self.check_up()?;
            self.inner.find_events(filter).await
        })
    }

    fn update_event(&self, event: Event, expected: Revision) -> StoreFuture<'_, Event> {
        Box::pin(async move {
            self.check_write()?;
            self.inner.update_event(event, expected).await
        })
    }

    fn delete_event_cascade(&self, id: EventId) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            self.check_up()?;
            self.inner.delete_event_cascade(id).await
        })
    }

    fn event_tally(&self) -> StoreFuture<'_, EventTally> {
        Box::pin(async move {
            self.check_up()?;
            self.inner.event_tally().await
        })
    }
}

impl RegistrationStore for FlakyStore {
    fn admit(&self, request: AdmissionRequest) -> StoreFuture<'_, Registration> {
        Box::pin(async move {
            self.check_write()?;
            self.inner.admit(request).await
        })
    }

    fn cancel(
        &self,
        id: RegistrationId,
        requested_by: UserId,
        at: DateTime<Utc>,
    ) -> StoreFuture<'_, CancelOutcome> {
        Box::pin(async move {
            self.check_write()?;
            self.inner.cancel(id, requested_by, at).await
        })
    }

    fn load_registration(&self, id: RegistrationId) -> StoreFuture<'_, Option<Registration>> {
        Box::pin(async move {
            self.check_up()?;
            self.inner.load_registration(id).await
        })
    }

    fn count_confirmed(&self, event_id: EventId) -> StoreFuture<'_, u32> {
        Box::pin(async move {
            self.check_up()?;
            self.inner.count_confirmed(event_id).await
        })
    }

    fn confirmed_counts(&self, event_ids: Vec<EventId>) -> StoreFuture<'_, HashMap<EventId, u32>> {
        Box::pin(async move {
            self.check_up()?;
            self.inner.confirmed_counts(event_ids).await
        })
    }

    fn find_confirmed(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> StoreFuture<'_, Option<Registration>> {
        Box::pin(async move {
            self.check_up()?;
            self.inner.find_confirmed(event_id, user_id).await
        })
    }

    fn registrations_for_user(&self, user_id: UserId) -> StoreFuture<'_, Vec<Registration>> {
        Box::pin(async move {
            self.check_up()?;
            self.inner.registrations_for_user(user_id).await
        })
    }

    fn registration_tally(&self) -> StoreFuture<'_, RegistrationTally> {
        Box::pin(async move {
            self.check_up()?;
            self.inner.registration_tally().await
        })
    }
}

impl Storage for FlakyStore {
    fn backend(&self) -> &'static str {
        "flaky-memory"
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.check_up()?;
            self.inner.ping().await
        })
    }
}
