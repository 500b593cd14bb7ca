//! Registration records.

use crate::error::StoreError;
use crate::types::{EventId, RegistrationId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    /// Holds a seat.
    Confirmed,
    /// Released by its owner. Kept as history.
    Cancelled,
}

impl RegistrationStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse the storage representation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupt`] for unknown values.
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        match s {
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(StoreError::Corrupt(format!(
                "unknown registration status: {other}"
            ))),
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's claim on a seat at an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    /// Identifier.
    pub id: RegistrationId,
    /// Event the seat belongs to.
    pub event_id: EventId,
    /// Owner.
    pub user_id: UserId,
    /// Current status.
    pub status: RegistrationStatus,
    /// Optional note from the attendee.
    pub notes: Option<String>,
    /// When admission confirmed it.
    pub created_at: DateTime<Utc>,
    /// When its owner cancelled it.
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Registration {
    /// Whether the registration currently holds a seat.
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        matches!(self.status, RegistrationStatus::Confirmed)
    }

    /// Mark as cancelled. Returns `false` when it already was.
    pub fn cancel(&mut self, at: DateTime<Utc>) -> bool {
        if self.is_confirmed() {
            self.status = RegistrationStatus::Cancelled;
            self.cancelled_at = Some(at);
            true
        } else {
            false
        }
    }
}

/// Result of a cancellation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOutcome {
    /// The registration after the call.
    pub registration: Registration,
    /// `false` when the registration was already cancelled.
    pub changed: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_idempotent() {
        let first = Utc::now();
        let mut registration = Registration {
            id: RegistrationId::new(),
            event_id: EventId::new(),
            user_id: UserId::new(),
            status: RegistrationStatus::Confirmed,
            notes: None,
            created_at: first,
            cancelled_at: None,
        };

        assert!(registration.cancel(first));
        assert!(!registration.cancel(Utc::now()));
        assert_eq!(registration.status, RegistrationStatus::Cancelled);
        assert_eq!(registration.cancelled_at, Some(first));
    }

    #[test]
    fn status_storage_roundtrip() {
        assert_eq!(
            RegistrationStatus::parse("cancelled").unwrap(),
            RegistrationStatus::Cancelled
        );
        assert!(RegistrationStatus::parse("pending").is_err());
    }
}
