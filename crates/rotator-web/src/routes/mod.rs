//! Route handlers for the rotator web service.

pub mod diagnostics;
pub mod health;
pub mod rotate;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;

/// Build the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        // Public rotation link
        .route("/rotate/:slug", get(rotate::rotate))
        // Health check
        .route("/health", get(health::health))
        // API endpoints
        .route(
            "/api/groups/:slug/rotation-stats",
            get(diagnostics::rotation_stats).post(diagnostics::rotation_stats),
        )
}
