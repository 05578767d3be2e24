//! Application state for the HTTP server.

use std::sync::Arc;

use crate::db::repository::ProfitRepository;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Store handle opened by `db::connect`
    pub repository: Arc<dyn ProfitRepository>,
}

impl AppState {
    /// Create a new application state with the given repository.
    pub fn new(repository: Arc<dyn ProfitRepository>) -> Self {
        Self { repository }
    }
}
