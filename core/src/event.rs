//! Event records and their field validation.
//!
//! An [`Event`] is what organizers publish and members register for. Its
//! moderation status lives in [`LifecycleState`]; the transitions between
//! states are in [`crate::lifecycle`].

use crate::error::{Rejection, StoreError};
use crate::types::{Capacity, EventId, Revision, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Moderation status of an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// Awaiting moderator review. New and edited events start here.
    Pending,
    /// Published; accepts registrations.
    Approved,
    /// Turned down by a moderator.
    Rejected,
}

impl LifecycleState {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parse the storage representation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupt`] for unknown values.
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(StoreError::Corrupt(format!("unknown lifecycle state: {other}"))),
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Availability of an event as seen by a would-be attendee.
///
/// Derived from the lifecycle state, the live confirmed count and the
/// current date. Never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventPhase {
    /// Waiting for a moderator.
    PendingReview,
    /// Turned down.
    Rejected,
    /// Approved with free seats.
    Open,
    /// Approved, every seat confirmed.
    Full,
    /// Approved, but the date is behind us.
    Past,
}

/// A published (or to-be-published) event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Identifier.
    pub id: EventId,
    /// Title.
    pub title: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Calendar date.
    pub date: NaiveDate,
    /// Start time as entered by the organizer, e.g. `18:30`.
    pub time: String,
    /// Venue.
    pub location: String,
    /// Optional category used for browsing.
    pub category: Option<String>,
    /// Seat limit.
    pub capacity: Capacity,
    /// Owning user.
    pub organizer: UserId,
    /// Moderation status.
    pub state: LifecycleState,
    /// Optimistic concurrency token.
    pub revision: Revision,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Whether the event accepts registrations.
    #[must_use]
    pub const fn is_approved(&self) -> bool {
        matches!(self.state, LifecycleState::Approved)
    }

    /// Whether `user` owns the event.
    #[must_use]
    pub fn is_organized_by(&self, user: UserId) -> bool {
        self.organizer == user
    }

    /// Derive the attendee-facing phase.
    #[must_use]
    pub fn phase(&self, confirmed: u32, today: NaiveDate) -> EventPhase {
        match self.state {
            LifecycleState::Pending => EventPhase::PendingReview,
            LifecycleState::Rejected => EventPhase::Rejected,
            LifecycleState::Approved => {
                if self.date < today {
                    EventPhase::Past
                } else if self.capacity.has_room_for(confirmed) {
                    EventPhase::Open
                } else {
                    EventPhase::Full
                }
            }
        }
    }
}

/// Fields supplied by an organizer when creating an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    /// Title, required.
    pub title: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Date.
    pub date: NaiveDate,
    /// Start time.
    pub time: String,
    /// Venue, required.
    pub location: String,
    /// Category.
    #[serde(default)]
    pub category: Option<String>,
    /// Seat limit; must be positive.
    pub capacity: u32,
}

impl EventDraft {
    /// Validate the draft and turn it into a pending event owned by `organizer`.
    ///
    /// # Errors
    ///
    /// Returns [`Rejection::Invalid`] when a required field is blank or the
    /// capacity is zero.
    pub fn into_event(
        self,
        id: EventId,
        organizer: UserId,
        now: DateTime<Utc>,
    ) -> Result<Event, Rejection> {
        Ok(Event {
            id,
            title: required("title", self.title)?,
            description: optional(self.description),
            date: self.date,
            time: required("time", self.time)?,
            location: required("location", self.location)?,
            category: optional(self.category),
            capacity: capacity(self.capacity)?,
            organizer,
            state: LifecycleState::Pending,
            revision: Revision::INITIAL,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update of an event's details. `None` leaves a field unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventPatch {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New date.
    pub date: Option<NaiveDate>,
    /// New start time.
    pub time: Option<String>,
    /// New venue.
    pub location: Option<String>,
    /// New category.
    pub category: Option<String>,
    /// New seat limit.
    pub capacity: Option<u32>,
}

impl EventPatch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.date.is_none()
            && self.time.is_none()
            && self.location.is_none()
            && self.category.is_none()
            && self.capacity.is_none()
    }

    /// Check every supplied field without applying anything.
    ///
    /// # Errors
    ///
    /// Returns [`Rejection::Invalid`] for blank required fields, zero capacity
    /// or an empty patch.
    pub fn validate(&self) -> Result<(), Rejection> {
        if self.is_empty() {
            return Err(Rejection::Invalid("edit contains no changes".to_string()));
        }
        if let Some(title) = &self.title {
            required("title", title.clone())?;
        }
        if let Some(time) = &self.time {
            required("time", time.clone())?;
        }
        if let Some(location) = &self.location {
            required("location", location.clone())?;
        }
        if let Some(seats) = self.capacity {
            capacity(seats)?;
        }
        Ok(())
    }

    /// Write the supplied fields into `event`. Call [`Self::validate`] first.
    ///
    /// # Errors
    ///
    /// Same as [`Self::validate`].
    pub fn apply_to(&self, event: &mut Event) -> Result<(), Rejection> {
        if let Some(title) = &self.title {
            event.title = required("title", title.clone())?;
        }
        if let Some(description) = &self.description {
            event.description = optional(Some(description.clone()));
        }
        if let Some(date) = self.date {
            event.date = date;
        }
        if let Some(time) = &self.time {
            event.time = required("time", time.clone())?;
        }
        if let Some(location) = &self.location {
            event.location = required("location", location.clone())?;
        }
        if let Some(category) = &self.category {
            event.category = optional(Some(category.clone()));
        }
        if let Some(seats) = self.capacity {
            event.capacity = capacity(seats)?;
        }
        Ok(())
    }
}

fn required(field: &str, value: String) -> Result<String, Rejection> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(Rejection::Invalid(format!("{field} is required")))
    } else {
        Ok(trimmed.to_string())
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn capacity(seats: u32) -> Result<Capacity, Rejection> {
    Capacity::new(seats).map_err(|e| Rejection::Invalid(e.to_string()))
}
