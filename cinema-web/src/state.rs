//! Application state for Axum handlers.

use cinema_core::ReservationCoordinator;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Cheap to clone: the coordinator is held behind an `Arc`, and Axum
/// clones state per request.
#[derive(Clone)]
pub struct AppState {
    /// The reservation coordinator handlers dispatch to.
    pub coordinator: Arc<ReservationCoordinator>,
}

impl AppState {
    /// Wrap a coordinator in application state.
    #[must_use]
    pub const fn new(coordinator: Arc<ReservationCoordinator>) -> Self {
        Self { coordinator }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinema_core::environment::SystemClock;
    use cinema_testing::mocks::{InMemoryFastIndex, InMemoryStore};

    #[test]
    fn state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn state_wraps_coordinator() {
        let coordinator = Arc::new(ReservationCoordinator::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryFastIndex::new()),
            Arc::new(SystemClock),
        ));
        let state = AppState::new(coordinator);
        let _ = state.coordinator.clone();
    }
}
