//! Read-side views handed to the presentation layer.

use crate::event::{Event, EventPhase, LifecycleState};
use crate::registration::Registration;
use crate::store::{EventTally, RegistrationTally};
use crate::types::EventId;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// An event annotated with live occupancy and the viewer's own status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventView {
    /// The record.
    #[serde(flatten)]
    pub event: Event,
    /// Confirmed registrations right now.
    pub registered_count: u32,
    /// Free seats.
    pub seats_left: u32,
    /// Attendee-facing phase.
    pub phase: EventPhase,
    /// Whether the viewer holds a confirmed registration. Always `false`
    /// for anonymous viewers.
    pub is_registered: bool,
}

impl EventView {
    /// Assemble a view.
    #[must_use]
    pub fn new(event: Event, registered_count: u32, is_registered: bool, today: NaiveDate) -> Self {
        let phase = event.phase(registered_count, today);
        let seats_left = event.capacity.get().saturating_sub(registered_count);
        Self {
            event,
            registered_count,
            seats_left,
            phase,
            is_registered,
        }
    }
}

/// The parts of an event shown next to a registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    /// Identifier.
    pub id: EventId,
    /// Title.
    pub title: String,
    /// Date.
    pub date: NaiveDate,
    /// Start time.
    pub time: String,
    /// Venue.
    pub location: String,
    /// Moderation status.
    pub state: LifecycleState,
}

impl From<&Event> for EventSummary {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id,
            title: event.title.clone(),
            date: event.date,
            time: event.time.clone(),
            location: event.location.clone(),
            state: event.state,
        }
    }
}

/// A registration joined with its event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationView {
    /// The record.
    #[serde(flatten)]
    pub registration: Registration,
    /// Its event.
    pub event: EventSummary,
}

impl RegistrationView {
    /// Sort key: upcoming events first, then by start time text.
    #[must_use]
    pub fn sort_key(&self) -> (NaiveDate, Option<NaiveTime>) {
        (
            self.event.date,
            NaiveTime::parse_from_str(&self.event.time, "%H:%M").ok(),
        )
    }
}

/// Moderator dashboard numbers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Events by lifecycle state.
    pub events: EventTally,
    /// Registrations by status.
    pub registrations: RegistrationTally,
}
