//! Row types and their conversion to and from domain records.

use chrono::{DateTime, NaiveDate, Utc};
use eventgate_core::error::{Rejection, StoreError};
use eventgate_core::event::{Event, LifecycleState};
use eventgate_core::registration::{Registration, RegistrationStatus};
use eventgate_core::types::{Capacity, EventId, RegistrationId, Revision, UserId};
use uuid::Uuid;

/// Column list matching [`EventRow`].
pub(crate) const EVENT_COLUMNS: &str = "id, title, description, event_date, event_time, location, \
     category, capacity, organizer_id, state, revision, created_at, updated_at";

/// Column list matching [`RegistrationRow`].
pub(crate) const REGISTRATION_COLUMNS: &str =
    "id, event_id, user_id, status, notes, created_at, cancelled_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct EventRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    event_date: NaiveDate,
    event_time: String,
    location: String,
    category: Option<String>,
    capacity: i32,
    organizer_id: Uuid,
    state: String,
    revision: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = StoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let capacity = u32::try_from(row.capacity)
            .ok()
            .and_then(|seats| Capacity::new(seats).ok())
            .ok_or_else(|| StoreError::Corrupt(format!("event {} has capacity {}", row.id, row.capacity)))?;
        let revision = u64::try_from(row.revision)
            .map(Revision::new)
            .map_err(|_| StoreError::Corrupt(format!("event {} has revision {}", row.id, row.revision)))?;

        Ok(Self {
            id: EventId::from_uuid(row.id),
            title: row.title,
            description: row.description,
            date: row.event_date,
            time: row.event_time,
            location: row.location,
            category: row.category,
            capacity,
            organizer: UserId::from_uuid(row.organizer_id),
            state: LifecycleState::parse(&row.state)?,
            revision,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct RegistrationRow {
    id: Uuid,
    event_id: Uuid,
    user_id: Uuid,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    cancelled_at: Option<DateTime<Utc>>,
}

impl TryFrom<RegistrationRow> for Registration {
    type Error = StoreError;

    fn try_from(row: RegistrationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: RegistrationId::from_uuid(row.id),
            event_id: EventId::from_uuid(row.event_id),
            user_id: UserId::from_uuid(row.user_id),
            status: RegistrationStatus::parse(&row.status)?,
            notes: row.notes,
            created_at: row.created_at,
            cancelled_at: row.cancelled_at,
        })
    }
}

/// Capacity as stored.
pub(crate) fn capacity_column(event: &Event) -> Result<i32, StoreError> {
    i32::try_from(event.capacity.get()).map_err(|_| {
        Rejection::Invalid(format!("capacity must be at most {}", i32::MAX)).into()
    })
}

/// Revision as stored.
pub(crate) fn revision_column(revision: Revision) -> Result<i64, StoreError> {
    i64::try_from(revision.value())
        .map_err(|_| StoreError::Database(format!("revision {revision} does not fit the column")))
}

/// Row count as a seat count.
pub(crate) fn seat_count(count: i64) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Row count as a tally.
pub(crate) fn tally_count(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}
