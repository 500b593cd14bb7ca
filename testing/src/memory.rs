//! In-process storage backend.
//!
//! Every event lives in its own mutex-guarded slot together with its
//! registrations, so admissions for one event are serialized while
//! different events proceed in parallel.
//!
//! Lock order: the slot map (briefly, to clone an `Arc`), then one slot,
//! then the registration index. The map lock is never held while waiting
//! on a slot, except by deletion, which removes the slot before locking it.

use chrono::{DateTime, Utc};
use eventgate_core::admission::{self, AdmissionRequest, SeatSnapshot};
use eventgate_core::error::{Rejection, StoreError};
use eventgate_core::event::Event;
use eventgate_core::registration::{CancelOutcome, Registration, RegistrationStatus};
use eventgate_core::store::{
    EventFilter, EventStore, EventTally, RegistrationStore, RegistrationTally, Storage, StoreFuture,
};
use eventgate_core::types::{EventId, RegistrationId, Revision, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

#[derive(Debug)]
struct EventSlot {
    event: Event,
    registrations: HashMap<RegistrationId, Registration>,
    deleted: bool,
}

impl EventSlot {
    fn live_event(&self) -> Option<&Event> {
        (!self.deleted).then_some(&self.event)
    }

    fn confirmed(&self) -> impl Iterator<Item = &Registration> {
        self.registrations.values().filter(|r| r.is_confirmed())
    }

    fn confirmed_count(&self) -> u32 {
        u32::try_from(self.confirmed().count()).unwrap_or(u32::MAX)
    }

    fn confirmed_for(&self, user_id: UserId) -> Option<&Registration> {
        self.confirmed().find(|r| r.user_id == user_id)
    }
}

type Slot = Arc<Mutex<EventSlot>>;

#[derive(Debug, Default)]
struct Inner {
    events: RwLock<HashMap<EventId, Slot>>,
    index: Mutex<HashMap<RegistrationId, EventId>>,
}

/// Thread-safe in-memory [`Storage`].
///
/// Used by the server when no database is configured and by the test
/// suites. Clones share the same data.
///
/// # Example
///
/// ```
/// use eventgate_testing::InMemoryStore;
/// use eventgate_core::store::Storage;
///
/// let store = InMemoryStore::new();
/// assert_eq!(store.backend(), "memory");
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryStore {
    inner: Arc<Inner>,
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("in-memory store lock poisoned".to_string())
}

fn lock(slot: &Slot) -> Result<MutexGuard<'_, EventSlot>, StoreError> {
    slot.lock().map_err(poisoned)
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events currently stored.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.inner.events.read().map_or(0, |events| events.len())
    }

    /// Number of registrations in any status.
    #[must_use]
    pub fn registration_count(&self) -> usize {
        self.inner.index.lock().map_or(0, |index| index.len())
    }

    fn slot(&self, id: EventId) -> Result<Option<Slot>, StoreError> {
        let events = self.inner.events.read().map_err(poisoned)?;
        Ok(events.get(&id).cloned())
    }

    fn all_slots(&self) -> Result<Vec<Slot>, StoreError> {
        let events = self.inner.events.read().map_err(poisoned)?;
        Ok(events.values().cloned().collect())
    }

    fn with_slot<T>(
        &self,
        id: EventId,
        f: impl FnOnce(&mut EventSlot) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let slot = self.slot(id)?.ok_or_else(|| Rejection::event_not_found(id))?;
        let mut guard = lock(&slot)?;
        if guard.deleted {
            return Err(Rejection::event_not_found(id).into());
        }
        f(&mut guard)
    }

    fn insert_event_sync(&self, event: Event) -> Result<(), StoreError> {
        let mut events = self.inner.events.write().map_err(poisoned)?;
        if events.contains_key(&event.id) {
            return Err(StoreError::Database(format!("event {} already exists", event.id)));
        }
        events.insert(
            event.id,
            Arc::new(Mutex::new(EventSlot {
                event,
                registrations: HashMap::new(),
                deleted: false,
            })),
        );
        Ok(())
    }

    fn load_event_sync(&self, id: EventId) -> Result<Option<Event>, StoreError> {
        let Some(slot) = self.slot(id)? else {
            return Ok(None);
        };
        let guard = lock(&slot)?;
        Ok(guard.live_event().cloned())
    }

    fn find_events_sync(&self, filter: &EventFilter) -> Result<Vec<Event>, StoreError> {
        let mut found = Vec::new();
        for slot in self.all_slots()? {
            let guard = lock(&slot)?;
            if let Some(event) = guard.live_event().filter(|e| filter.matches(e)) {
                found.push(event.clone());
            }
        }
        found.sort_by(|a, b| (a.date, a.created_at).cmp(&(b.date, b.created_at)));
        Ok(found)
    }

    fn update_event_sync(&self, event: Event, expected: Revision) -> Result<Event, StoreError> {
        self.with_slot(event.id, |slot| {
            if slot.event.revision != expected {
                return Err(StoreError::VersionConflict {
                    event_id: event.id,
                    expected,
                    actual: slot.event.revision,
                });
            }

            let confirmed = slot.confirmed_count();
            if event.capacity.get() < confirmed {
                return Err(Rejection::Invalid(format!(
                    "capacity {} is below the {confirmed} confirmed registrations",
                    event.capacity
                ))
                .into());
            }

            slot.event = event;
            Ok(slot.event.clone())
        })
    }

    fn delete_event_sync(&self, id: EventId) -> Result<u64, StoreError> {
        let slot = {
            let mut events = self.inner.events.write().map_err(poisoned)?;
            events.remove(&id).ok_or_else(|| Rejection::event_not_found(id))?
        };

        let mut guard = lock(&slot)?;
        guard.deleted = true;
        let removed: Vec<RegistrationId> = guard.registrations.drain().map(|(id, _)| id).collect();

        let mut index = self.inner.index.lock().map_err(poisoned)?;
        for registration_id in &removed {
            index.remove(registration_id);
        }
        Ok(removed.len() as u64)
    }

    fn event_tally_sync(&self) -> Result<EventTally, StoreError> {
        let mut tally = EventTally::default();
        for slot in self.all_slots()? {
            let guard = lock(&slot)?;
            if let Some(event) = guard.live_event() {
                tally.record(event.state);
            }
        }
        Ok(tally)
    }

    fn admit_sync(&self, request: &AdmissionRequest) -> Result<Registration, StoreError> {
        let slot = self.slot(request.event_id)?;
        let mut guard = slot.as_ref().map(lock).transpose()?;

        let snapshot = guard.as_deref().map_or(
            SeatSnapshot {
                event: None,
                existing: None,
                confirmed: 0,
            },
            |slot| SeatSnapshot {
                event: slot.live_event(),
                existing: slot.confirmed_for(request.user_id).map(|r| r.id),
                confirmed: slot.confirmed_count(),
            },
        );
        let registration = admission::decide(snapshot, request)?;

        let Some(guard) = guard.as_mut() else {
            return Err(Rejection::event_not_found(request.event_id).into());
        };
        guard
            .registrations
            .insert(registration.id, registration.clone());
        self.inner
            .index
            .lock()
            .map_err(poisoned)?
            .insert(registration.id, registration.event_id);
        Ok(registration)
    }

    fn event_of(&self, id: RegistrationId) -> Result<Option<EventId>, StoreError> {
        let index = self.inner.index.lock().map_err(poisoned)?;
        Ok(index.get(&id).copied())
    }

    fn cancel_sync(
        &self,
        id: RegistrationId,
        requested_by: UserId,
        at: DateTime<Utc>,
    ) -> Result<CancelOutcome, StoreError> {
        let not_found = || StoreError::from(Rejection::registration_not_found(id));
        let event_id = self.event_of(id)?.ok_or_else(not_found)?;
        let slot = self.slot(event_id)?.ok_or_else(not_found)?;

        let mut guard = lock(&slot)?;
        let registration = guard.registrations.get_mut(&id).ok_or_else(not_found)?;
        if registration.user_id != requested_by {
            return Err(Rejection::forbidden("only the attendee may cancel this registration").into());
        }

        let changed = registration.cancel(at);
        Ok(CancelOutcome {
            registration: registration.clone(),
            changed,
        })
    }

    fn load_registration_sync(&self, id: RegistrationId) -> Result<Option<Registration>, StoreError> {
        let Some(event_id) = self.event_of(id)? else {
            return Ok(None);
        };
        let Some(slot) = self.slot(event_id)? else {
            return Ok(None);
        };
        let guard = lock(&slot)?;
        Ok(guard.registrations.get(&id).cloned())
    }

    fn confirmed_counts_sync(
        &self,
        event_ids: &[EventId],
    ) -> Result<HashMap<EventId, u32>, StoreError> {
        let mut counts = HashMap::with_capacity(event_ids.len());
        for &event_id in event_ids {
            let count = match self.slot(event_id)? {
                Some(slot) => lock(&slot)?.confirmed_count(),
                None => 0,
            };
            counts.insert(event_id, count);
        }
        Ok(counts)
    }

    fn find_confirmed_sync(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Option<Registration>, StoreError> {
        let Some(slot) = self.slot(event_id)? else {
            return Ok(None);
        };
        let guard = lock(&slot)?;
        Ok(guard.confirmed_for(user_id).cloned())
    }

    fn registrations_for_user_sync(&self, user_id: UserId) -> Result<Vec<Registration>, StoreError> {
        let mut found = Vec::new();
        for slot in self.all_slots()? {
            let guard = lock(&slot)?;
            found.extend(
                guard
                    .registrations
                    .values()
                    .filter(|r| r.user_id == user_id)
                    .cloned(),
            );
        }
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    fn registration_tally_sync(&self) -> Result<RegistrationTally, StoreError> {
        let mut tally = RegistrationTally::default();
        for slot in self.all_slots()? {
            let guard = lock(&slot)?;
            for registration in guard.registrations.values() {
                match registration.status {
                    RegistrationStatus::Confirmed => tally.confirmed += 1,
                    RegistrationStatus::Cancelled => tally.cancelled += 1,
                }
            }
        }
        Ok(tally)
    }
}

impl EventStore for InMemoryStore {
    fn insert_event(&self, event: Event) -> StoreFuture<'_, ()> {
        Box::pin(async move { self.insert_event_sync(event) })
    }

    fn load_event(&self, id: EventId) -> StoreFuture<'_, Option<Event>> {
        Box::pin(async move { self.load_event_sync(id) })
    }

    fn find_events(&self, filter: EventFilter) -> StoreFuture<'_, Vec<Event>> {
        Box::pin(async move { self.find_events_sync(&filter) })
    }

    fn update_event(&self, event: Event, expected: Revision) -> StoreFuture<'_, Event> {
        Box::pin(async move { self.update_event_sync(event, expected) })
    }

    fn delete_event_cascade(&self, id: EventId) -> StoreFuture<'_, u64> {
        Box::pin(async move { self.delete_event_sync(id) })
    }

    fn event_tally(&self) -> StoreFuture<'_, EventTally> {
        Box::pin(async move { self.event_tally_sync() })
    }
}

impl RegistrationStore for InMemoryStore {
    fn admit(&self, request: AdmissionRequest) -> StoreFuture<'_, Registration> {
        Box::pin(async move { self.admit_sync(&request) })
    }

    fn cancel(
        &self,
        id: RegistrationId,
        requested_by: UserId,
        at: DateTime<Utc>,
    ) -> StoreFuture<'_, CancelOutcome> {
        Box::pin(async move { self.cancel_sync(id, requested_by, at) })
    }

    fn load_registration(&self, id: RegistrationId) -> StoreFuture<'_, Option<Registration>> {
        Box::pin(async move { self.load_registration_sync(id) })
    }

    fn count_confirmed(&self, event_id: EventId) -> StoreFuture<'_, u32> {
        Box::pin(async move {
            Ok(self
                .confirmed_counts_sync(&[event_id])?
                .get(&event_id)
                .copied()
                .unwrap_or(0))
        })
    }

    fn confirmed_counts(&self, event_ids: Vec<EventId>) -> StoreFuture<'_, HashMap<EventId, u32>> {
        Box::pin(async move { self.confirmed_counts_sync(&event_ids) })
    }

    fn find_confirmed(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> StoreFuture<'_, Option<Registration>> {
        Box::pin(async move { self.find_confirmed_sync(event_id, user_id) })
    }

    fn registrations_for_user(&self, user_id: UserId) -> StoreFuture<'_, Vec<Registration>> {
        Box::pin(async move { self.registrations_for_user_sync(user_id) })
    }

    fn registration_tally(&self) -> StoreFuture<'_, RegistrationTally> {
        Box::pin(async move { self.registration_tally_sync() })
    }
}

impl Storage for InMemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            drop(self.inner.events.read().map_err(poisoned)?);
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::fixtures::{approved_event, pending_event};

    fn request(event_id: EventId, user_id: UserId) -> AdmissionRequest {
        AdmissionRequest::new(event_id, user_id, None, Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn admits_until_full() {
        let store = InMemoryStore::new();
        let event = approved_event(2);
        store.insert_event(event.clone()).await.unwrap();

        store.admit(request(event.id, UserId::new())).await.unwrap();
        store.admit(request(event.id, UserId::new())).await.unwrap();
        let err = store.admit(request(event.id, UserId::new())).await.unwrap_err();

        assert!(matches!(err, StoreError::Rejected(Rejection::CapacityFull { .. })));
        assert_eq!(store.count_confirmed(event.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn missing_event_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.admit(request(EventId::new(), UserId::new())).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected(Rejection::NotFound { .. })));
    }

    #[tokio::test]
    async fn pending_event_is_not_approved() {
        let store = InMemoryStore::new();
        let event = pending_event(5);
        store.insert_event(event.clone()).await.unwrap();

        let err = store.admit(request(event.id, UserId::new())).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected(Rejection::NotApproved { .. })));
    }

    #[tokio::test]
    async fn cancel_checks_owner_and_is_idempotent() {
        let store = InMemoryStore::new();
        let event = approved_event(1);
        store.insert_event(event.clone()).await.unwrap();
        let user = UserId::new();
        let registration = store.admit(request(event.id, user)).await.unwrap();

        let err = store
            .cancel(registration.id, UserId::new(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected(Rejection::Forbidden { .. })));

        let first = store.cancel(registration.id, user, Utc::now()).await.unwrap();
        let second = store.cancel(registration.id, user, Utc::now()).await.unwrap();
        assert!(first.changed);
        assert!(!second.changed);
        assert_eq!(second.registration.cancelled_at, first.registration.cancelled_at);
        assert_eq!(store.count_confirmed(event.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn update_refuses_stale_revision_and_low_capacity() {
        let store = InMemoryStore::new();
        let event = approved_event(2);
        store.insert_event(event.clone()).await.unwrap();
        store.admit(request(event.id, UserId::new())).await.unwrap();
        store.admit(request(event.id, UserId::new())).await.unwrap();

        let mut shrunk = event.clone();
        shrunk.capacity = eventgate_core::types::Capacity::new(1).unwrap();
        shrunk.revision = event.revision.next();
        let err = store.update_event(shrunk.clone(), event.revision).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected(Rejection::Invalid(_))));

        let err = store.update_event(shrunk, event.revision.next()).await.unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { .. }));
    }

    #[tokio::test]
    async fn delete_removes_registrations() {
        let store = InMemoryStore::new();
        let event = approved_event(3);
        store.insert_event(event.clone()).await.unwrap();
        let registration = store.admit(request(event.id, UserId::new())).await.unwrap();

        assert_eq!(store.delete_event_cascade(event.id).await.unwrap(), 1);
        assert!(store.load_event(event.id).await.unwrap().is_none());
        assert!(store.load_registration(registration.id).await.unwrap().is_none());
        assert_eq!(store.registration_count(), 0);
    }

    #[tokio::test]
    async fn ping_releases_the_event_map() {
        let store = InMemoryStore::new();
        store.ping().await.unwrap();

        // A held read guard would block this write forever.
        let event = approved_event(1);
        store.insert_event(event.clone()).await.unwrap();
        store.ping().await.unwrap();
        assert_eq!(store.backend(), "memory");
    }
}
