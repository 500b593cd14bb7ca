//! The [`EventDesk`] service and its wiring.

use crate::health::{HealthReport, check_storage};
use crate::retry::RetryPolicy;
use chrono::{DateTime, NaiveDate, Utc};
use eventgate_core::environment::{Clock, SystemClock};
use eventgate_core::store::Storage;
use std::sync::Arc;

/// Injected dependencies of the desk.
#[derive(Clone)]
pub struct DeskEnvironment {
    /// Source of "now" for timestamps and the derived event phase.
    pub clock: Arc<dyn Clock>,
}

impl DeskEnvironment {
    /// Environment backed by the given clock.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl Default for DeskEnvironment {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for DeskEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeskEnvironment").finish_non_exhaustive()
    }
}

/// Tunables.
#[derive(Debug, Clone, Default)]
pub struct DeskConfig {
    /// Backoff for operations that lose a race in storage.
    pub retry: RetryPolicy,
}

/// Entry point for every operation: admission, cancellation, lifecycle and
/// queries. Cheap to clone; all clones share one backend.
///
/// The desk holds no state of its own. Every invariant is enforced by the
/// storage backend's atomic primitives, so any number of desks (in one
/// process or many) may serve the same backend.
#[derive(Clone)]
pub struct EventDesk {
    pub(crate) storage: Arc<dyn Storage>,
    pub(crate) env: DeskEnvironment,
    pub(crate) config: DeskConfig,
}

impl EventDesk {
    /// Build a desk over `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>, env: DeskEnvironment, config: DeskConfig) -> Self {
        Self {
            storage,
            env,
            config,
        }
    }

    /// Desk with the system clock and default retry policy.
    #[must_use]
    pub fn with_defaults(storage: Arc<dyn Storage>) -> Self {
        Self::new(storage, DeskEnvironment::default(), DeskConfig::default())
    }

    /// The backend.
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Current configuration.
    #[must_use]
    pub const fn config(&self) -> &DeskConfig {
        &self.config
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.env.clock.now()
    }

    pub(crate) fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// Probe the backend.
    pub async fn health(&self) -> HealthReport {
        HealthReport::new(vec![check_storage(self.storage.as_ref()).await])
    }
}

impl std::fmt::Debug for EventDesk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDesk")
            .field("backend", &self.storage.backend())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
