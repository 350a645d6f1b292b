//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::warn;

use crate::state::AppState;

#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
    pub database: &'static str,
}

/// Health check endpoint. Reports `degraded` when the database is unreachable.
pub async fn health(State(state): State<AppState>) -> Json<Health> {
    let database = match state.dispatcher.store().ping().await {
        Ok(()) => "ok",
        Err(err) => {
            warn!(error = %err, "Health check database ping failed");
            "unavailable"
        }
    };

    Json(Health {
        status: if database == "ok" { "ok" } else { "degraded" },
        database,
    })
}
