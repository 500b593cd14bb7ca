//! Application state for Axum handlers.

use eventgate_runtime::EventDesk;

/// Application state shared across all HTTP handlers.
///
/// The desk is stateless and cheap to clone, so the state is too.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Entry point for every operation.
    pub desk: EventDesk,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub const fn new(desk: EventDesk) -> Self {
        Self { desk }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_is_clone() {
        // Axum requires Clone state.
        fn assert_clone<T: Clone + Send + Sync + 'static>() {}
        assert_clone::<AppState>();
    }
}
