//! # Eventgate Runtime
//!
//! The [`EventDesk`] service: every admission, cancellation, lifecycle and
//! query operation, executed against a pluggable [`Storage`] backend.
//!
//! The desk itself is stateless. Decisions are made by the pure functions in
//! `eventgate-core` inside the backend's per-event critical section, so the
//! capacity and uniqueness guarantees hold for any number of concurrent
//! callers and any number of desk instances sharing a backend.
//!
//! ## Core Components
//!
//! - **`EventDesk`**: the service entry point
//! - **Retry**: exponential backoff for operations that lose a storage race
//! - **Metrics**: Prometheus counters and histograms for admissions and
//!   lifecycle transitions
//! - **Health**: backend probes for readiness endpoints
//!
//! ## Example
//!
//! ```ignore
//! use eventgate_runtime::EventDesk;
//! use eventgate_testing::InMemoryStore;
//! use std::sync::Arc;
//!
//! let desk = EventDesk::with_defaults(Arc::new(InMemoryStore::new()));
//! let event = desk.create_event(draft, organizer).await?;
//! desk.approve(event.id, moderator).await?;
//! let registration = desk.try_register(event.id, attendee, None).await?;
//! ```
//!
//! [`Storage`]: eventgate_core::store::Storage

/// Retry logic with exponential backoff
pub mod retry;

/// Prometheus metrics for observability
pub mod metrics;

/// Health checks
pub mod health;

/// Desk error type
pub mod error;

/// Lifecycle operations and their result types
pub mod lifecycle;

mod admission;
mod desk;
mod query;

pub use desk::{DeskConfig, DeskEnvironment, EventDesk};
pub use error::DeskError;
pub use health::{HealthCheck, HealthReport, HealthStatus};
pub use lifecycle::DeletedEvent;
pub use retry::RetryPolicy;
