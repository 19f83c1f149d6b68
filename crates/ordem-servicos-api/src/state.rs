//! Shared application state.

use std::sync::Arc;

use ordem_servicos_core::clock::Clock;
use ordem_servicos_os::domain::repository::ServiceOrderRepository;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Time source for new orders and history entries.
    pub clock: Arc<dyn Clock>,
    /// Service order persistence.
    pub repository: Arc<dyn ServiceOrderRepository>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, repository: Arc<dyn ServiceOrderRepository>) -> Self {
        Self { clock, repository }
    }
}
