//! Health checks.

use axum::extract::State;

use crate::error::AppError;
use crate::loader::StoneStore;
use crate::soap::StockSource;
use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
///
/// # Errors
///
/// Returns `AppError::Database` (503) if the database is not reachable.
pub async fn readiness<S: StockSource, D: StoneStore>(
    State(state): State<AppState<S, D>>,
) -> Result<&'static str, AppError> {
    state.pipeline().store().ping().await?;
    Ok("ok")
}
