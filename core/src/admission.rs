//! Admission decision.
//!
//! [`decide`] is the single place that knows the order of the admission
//! checks. Storage backends call it from inside their per-event critical
//! section, after reading the event, the caller's confirmed registration and
//! the confirmed count under the same lock or transaction. Nothing else may
//! insert a confirmed registration.

use crate::error::Rejection;
use crate::event::Event;
use crate::registration::{Registration, RegistrationStatus};
use crate::types::{EventId, RegistrationId, UserId};
use chrono::{DateTime, Utc};

/// Longest accepted attendee note, in characters.
pub const MAX_NOTES_LEN: usize = 1_000;

/// A request to take a seat, with its identifier pre-allocated so that a
/// retried attempt produces the same registration id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdmissionRequest {
    /// Id the registration gets if admitted.
    pub registration_id: RegistrationId,
    /// Target event.
    pub event_id: EventId,
    /// Would-be attendee.
    pub user_id: UserId,
    /// Optional note.
    pub notes: Option<String>,
    /// When the request was made.
    pub requested_at: DateTime<Utc>,
}

impl AdmissionRequest {
    /// Build a request, normalizing the note.
    ///
    /// # Errors
    ///
    /// Returns [`Rejection::Invalid`] if the note exceeds [`MAX_NOTES_LEN`].
    pub fn new(
        event_id: EventId,
        user_id: UserId,
        notes: Option<String>,
        requested_at: DateTime<Utc>,
    ) -> Result<Self, Rejection> {
        let notes = notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        if notes.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTES_LEN) {
            return Err(Rejection::Invalid(format!(
                "notes must be at most {MAX_NOTES_LEN} characters"
            )));
        }

        Ok(Self {
            registration_id: RegistrationId::new(),
            event_id,
            user_id,
            notes,
            requested_at,
        })
    }
}

/// Everything the decision needs, read atomically by the backend.
#[derive(Clone, Copy, Debug)]
pub struct SeatSnapshot<'a> {
    /// The event, if it exists.
    pub event: Option<&'a Event>,
    /// The caller's current confirmed registration for it, if any.
    pub existing: Option<RegistrationId>,
    /// Confirmed registrations for the event.
    pub confirmed: u32,
}

/// Run the admission checks in order and build the new registration.
///
/// 1. the event exists,
/// 2. it is approved,
/// 3. the user holds no confirmed registration for it,
/// 4. a seat is free.
///
/// # Errors
///
/// The first failing check, as [`Rejection::NotFound`],
/// [`Rejection::NotApproved`], [`Rejection::AlreadyRegistered`] or
/// [`Rejection::CapacityFull`].
pub fn decide(
    snapshot: SeatSnapshot<'_>,
    request: &AdmissionRequest,
) -> Result<Registration, Rejection> {
    let Some(event) = snapshot.event else {
        return Err(Rejection::event_not_found(request.event_id));
    };

    if !event.is_approved() {
        return Err(Rejection::NotApproved {
            event_id: event.id,
            state: event.state,
        });
    }

    if let Some(registration_id) = snapshot.existing {
        return Err(Rejection::AlreadyRegistered {
            event_id: event.id,
            user_id: request.user_id,
            registration_id,
        });
    }

    if !event.capacity.has_room_for(snapshot.confirmed) {
        return Err(Rejection::CapacityFull {
            event_id: event.id,
            capacity: event.capacity,
        });
    }

    Ok(Registration {
        id: request.registration_id,
        event_id: event.id,
        user_id: request.user_id,
        status: RegistrationStatus::Confirmed,
        notes: request.notes.clone(),
        created_at: request.requested_at,
        cancelled_at: None,
    })
}
