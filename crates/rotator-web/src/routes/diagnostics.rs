//! Rotation diagnostics for operators.

use axum::extract::{Path, State};
use axum::Json;
use rotation::RotationDiagnostics;

use crate::error::Result;
use crate::state::AppState;

/// Report a group's strategy, cursor, sequence stats and click distribution.
pub async fn rotation_stats(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<RotationDiagnostics>> {
    let diagnostics = state.dispatcher.diagnostics(&slug).await?;
    Ok(Json(diagnostics))
}
