//! # eventgate core
//!
//! Domain types and pure decision logic for moderated, capacity-limited
//! event registration.
//!
//! ## Core Concepts
//!
//! - **Event**: published by an organizer, reviewed by a moderator
//! - **Registration**: a user's claim on one seat of an approved event
//! - **Admission**: the ordered checks that confirm or reject a claim
//! - **Lifecycle**: the Pending / Approved / Rejected state machine
//! - **Storage**: traits whose atomic primitives make admission race-free
//!
//! ## Architecture Principles
//!
//! - Functional Core, Imperative Shell: [`admission::decide`] and
//!   [`lifecycle::decide`] are pure; backends and the runtime do the I/O
//! - Invariants live in types where possible ([`types::Capacity`] is never zero)
//! - Dependency injection via [`environment`]
//!
//! ## Example
//!
//! ```
//! use chrono::{NaiveDate, Utc};
//! use eventgate_core::admission::{self, AdmissionRequest, SeatSnapshot};
//! use eventgate_core::event::{EventDraft, LifecycleState};
//! use eventgate_core::types::{EventId, UserId};
//!
//! let mut event = EventDraft {
//!     title: "Meetup".into(),
//!     description: None,
//!     date: NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
//!     time: "19:00".into(),
//!     location: "Cafe".into(),
//!     category: None,
//!     capacity: 1,
//! }
//! .into_event(EventId::new(), UserId::new(), Utc::now())
//! .unwrap();
//! event.state = LifecycleState::Approved;
//!
//! let request = AdmissionRequest::new(event.id, UserId::new(), None, Utc::now()).unwrap();
//! let snapshot = SeatSnapshot { event: Some(&event), existing: None, confirmed: 0 };
//! assert!(admission::decide(snapshot, &request).is_ok());
//! ```

pub mod admission;
pub mod environment;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod query;
pub mod registration;
pub mod store;
pub mod types;

pub use error::{Rejection, StoreError};
pub use event::{Event, EventDraft, EventPatch, EventPhase, LifecycleState};
pub use registration::{CancelOutcome, Registration, RegistrationStatus};
pub use store::{EventFilter, EventStore, RegistrationStore, Storage, StoreFuture};
pub use types::{Actor, Capacity, EventId, RegistrationId, Revision, Role, UserId};
