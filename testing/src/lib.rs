//! # Eventgate Testing
//!
//! Testing utilities and the in-process storage backend.
//!
//! This crate provides:
//! - [`InMemoryStore`]: a complete [`Storage`] backend with per-event locking
//! - [`FlakyStore`]: fault injection for outage and retry tests
//! - Deterministic clocks
//! - [`LifecycleTest`]: Given-When-Then harness for moderation rules
//! - Fixtures and proptest strategies
//!
//! ## Example
//!
//! ```ignore
//! use eventgate_testing::{InMemoryStore, fixtures};
//! use eventgate_runtime::EventDesk;
//! use std::sync::Arc;
//!
//! #[tokio::test]
//! async fn seats_run_out() {
//!     let store = InMemoryStore::new();
//!     let event = fixtures::approved_event(1);
//!     store.insert_event(event.clone()).await.unwrap();
//!
//!     let desk = EventDesk::with_defaults(Arc::new(store));
//!     desk.try_register(event.id, UserId::new(), None).await.unwrap();
//!     assert!(desk.try_register(event.id, UserId::new(), None).await.is_err());
//! }
//! ```
//!
//! [`Storage`]: eventgate_core::store::Storage

/// Deterministic clocks
pub mod mocks;

/// Sample events and drafts
pub mod fixtures;

/// Property-based testing utilities using proptest.
pub mod properties;

mod flaky;
mod memory;

/// Test helpers and utilities.
pub mod helpers {
    use tracing_subscriber::EnvFilter;

    /// Route `tracing` output to the test harness, honouring `RUST_LOG`.
    /// Safe to call from every test.
    pub fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    }
}

// Re-export commonly used items
pub use flaky::FlakyStore;
pub use lifecycle_test::LifecycleTest;
pub use memory::InMemoryStore;
pub use mocks::{FixedClock, ManualClock, test_clock};
