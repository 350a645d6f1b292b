//! Application state shared across handlers.

use database::Database;
use rotation::{RotationConfig, RotationDispatcher};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Rotation dispatcher backed by the database.
    pub dispatcher: RotationDispatcher<Database>,
}

impl AppState {
    /// Create new application state.
    pub fn new(db: Database, config: RotationConfig) -> Self {
        Self {
            dispatcher: RotationDispatcher::with_config(db, config),
        }
    }
}
