//! Identifiers and value objects shared by every eventgate crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Error returned when a value object is constructed from invalid input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseValueError {
    /// Input was not a UUID.
    #[error("invalid identifier: {0}")]
    Identifier(String),

    /// Capacity must be strictly positive.
    #[error("capacity must be greater than zero")]
    ZeroCapacity,

    /// Role name is not one of `member` or `admin`.
    #[error("unknown role: {0}")]
    Role(String),
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`.")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Wraps an existing `Uuid` as a `", stringify!($name), "`.")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseValueError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|_| ParseValueError::Identifier(s.to_string()))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

uuid_id! {
    /// Unique identifier of a published event.
    EventId
}

uuid_id! {
    /// Unique identifier of a user, issued by the external identity provider.
    UserId
}

uuid_id! {
    /// Unique identifier of a registration record.
    RegistrationId
}

/// Maximum number of simultaneously confirmed registrations for an event.
///
/// Always strictly positive; the only way to obtain one is through
/// [`Capacity::new`] or deserialization, both of which reject zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Capacity(u32);

impl Capacity {
    /// Creates a capacity.
    ///
    /// # Errors
    ///
    /// Returns [`ParseValueError::ZeroCapacity`] when `seats` is zero.
    pub const fn new(seats: u32) -> Result<Self, ParseValueError> {
        if seats == 0 {
            Err(ParseValueError::ZeroCapacity)
        } else {
            Ok(Self(seats))
        }
    }

    /// Number of seats.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Whether `confirmed` registrations leave at least one seat free.
    #[must_use]
    pub const fn has_room_for(self, confirmed: u32) -> bool {
        confirmed < self.0
    }
}

impl TryFrom<u32> for Capacity {
    type Error = ParseValueError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Capacity> for u32 {
    fn from(value: Capacity) -> Self {
        value.0
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Optimistic concurrency token carried by every event record.
///
/// Incremented on each successful update. Writers pass the revision they
/// read and the store refuses the write if it has moved on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(u64);

impl Revision {
    /// Revision of a freshly created record.
    pub const INITIAL: Self = Self(1);

    /// Wraps a raw revision number.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw revision number.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// The revision that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Role of a caller as asserted by the authentication collaborator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular member: may organize events and register for them.
    #[default]
    Member,
    /// Moderator: may additionally approve and reject events.
    Admin,
}

impl Role {
    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "member" | "user" => Ok(Self::Member),
            "admin" | "moderator" => Ok(Self::Admin),
            other => Err(ParseValueError::Role(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated caller of an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    /// Who is calling.
    pub user_id: UserId,
    /// What they are allowed to do.
    pub role: Role,
}

impl Actor {
    /// A caller with the member role.
    #[must_use]
    pub const fn member(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Member,
        }
    }

    /// A caller with the moderator role.
    #[must_use]
    pub const fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Admin,
        }
    }

    /// Whether this caller may moderate events.
    #[must_use]
    pub const fn is_moderator(&self) -> bool {
        matches!(self.role, Role::Admin)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn capacity_rejects_zero() {
        assert_eq!(Capacity::new(0), Err(ParseValueError::ZeroCapacity));
        assert_eq!(Capacity::new(3).map(Capacity::get), Ok(3));
    }

    #[test]
    fn capacity_room_is_strict() {
        let capacity = Capacity::new(2).unwrap();
        assert!(capacity.has_room_for(1));
        assert!(!capacity.has_room_for(2));
    }

    #[test]
    fn capacity_deserialization_validates() {
        let ok: Capacity = serde_json::from_str("5").unwrap();
        assert_eq!(ok.get(), 5);
        assert!(serde_json::from_str::<Capacity>("0").is_err());
    }

    #[test]
    fn ids_parse_from_strings() {
        let id = EventId::new();
        let parsed: EventId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<UserId>().is_err());
    }

    #[test]
    fn role_names() {
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("member".parse::<Role>().unwrap(), Role::Member);
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn revision_advances() {
        assert_eq!(Revision::INITIAL.next(), Revision::new(2));
    }
}
