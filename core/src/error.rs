//! Rejection taxonomy and storage errors.
//!
//! Two families of errors:
//!
//! - [`Rejection`]: expected outcomes a caller can act on (the event is full,
//!   the caller is not the organizer, ...). These are values, not failures.
//! - [`StoreError`]: what a storage backend reports. It can carry a
//!   `Rejection` decided inside an atomic primitive, a retryable conflict, or
//!   a fatal outage.

use crate::event::LifecycleState;
use crate::types::{Capacity, EventId, RegistrationId, Revision, UserId};
use std::fmt;
use thiserror::Error;

/// Kind of record a [`Rejection::NotFound`] refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Resource {
    /// An event.
    Event,
    /// A registration.
    Registration,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Event => f.write_str("event"),
            Self::Registration => f.write_str("registration"),
        }
    }
}

/// Expected, recoverable-by-caller outcome of an operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The referenced record does not exist.
    #[error("{resource} {id} not found")]
    NotFound {
        /// Which kind of record.
        resource: Resource,
        /// Identifier that was looked up.
        id: String,
    },

    /// Registration attempted on an event that is not approved.
    #[error("event {event_id} is not open for registration (state: {state})")]
    NotApproved {
        /// The event.
        event_id: EventId,
        /// Its current lifecycle state.
        state: LifecycleState,
    },

    /// The user already holds a confirmed registration for the event.
    #[error("user {user_id} is already registered for event {event_id}")]
    AlreadyRegistered {
        /// The event.
        event_id: EventId,
        /// The user.
        user_id: UserId,
        /// The existing confirmed registration.
        registration_id: RegistrationId,
    },

    /// Every seat is taken.
    #[error("event {event_id} is full ({capacity} seats)")]
    CapacityFull {
        /// The event.
        event_id: EventId,
        /// Its capacity.
        capacity: Capacity,
    },

    /// The caller lacks rights for the operation.
    #[error("forbidden: {reason}")]
    Forbidden {
        /// Human-readable reason.
        reason: String,
    },

    /// Concurrent writes kept colliding until the retry budget ran out.
    #[error("conflicting concurrent update, gave up after {attempts} attempts")]
    Conflict {
        /// How many times the operation was tried.
        attempts: usize,
    },

    /// The requested lifecycle transition does not exist from the current state.
    #[error("cannot {action} an event in state {from}")]
    InvalidTransition {
        /// Current state.
        from: LifecycleState,
        /// Attempted action, e.g. `approve`.
        action: &'static str,
    },

    /// Input failed validation.
    #[error("invalid input: {0}")]
    Invalid(String),
}

impl Rejection {
    /// An event lookup came back empty.
    #[must_use]
    pub fn event_not_found(id: EventId) -> Self {
        Self::NotFound {
            resource: Resource::Event,
            id: id.to_string(),
        }
    }

    /// A registration lookup came back empty.
    #[must_use]
    pub fn registration_not_found(id: RegistrationId) -> Self {
        Self::NotFound {
            resource: Resource::Registration,
            id: id.to_string(),
        }
    }

    /// Caller is not allowed to perform the operation.
    #[must_use]
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    /// Stable machine-readable name of the rejection kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::NotApproved { .. } => "not_approved",
            Self::AlreadyRegistered { .. } => "already_registered",
            Self::CapacityFull { .. } => "capacity_full",
            Self::Forbidden { .. } => "forbidden",
            Self::Conflict { .. } => "conflict",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Invalid(_) => "invalid",
        }
    }
}

/// Errors reported by storage backends.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The atomic primitive evaluated the request and refused it.
    #[error(transparent)]
    Rejected(#[from] Rejection),

    /// The event changed since it was read.
    #[error("event {event_id} was modified concurrently: expected {expected}, found {actual}")]
    VersionConflict {
        /// The event.
        event_id: EventId,
        /// Revision the writer read.
        expected: Revision,
        /// Revision currently stored.
        actual: Revision,
    },

    /// The database aborted the transaction to preserve serializability.
    #[error("transaction aborted by concurrent access: {0}")]
    Serialization(String),

    /// The backend cannot be reached.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Query failed for a non-transient reason.
    #[error("database error: {0}")]
    Database(String),

    /// Stored data could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Whether repeating the same operation may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::VersionConflict { .. } | Self::Serialization(_))
    }
}
