//! Sync trigger and status.

use axum::{Json, extract::State, http::StatusCode};
use gemstock_core::{FailureKind, SyncOutcome, SyncProgress};

use crate::error::AppError;
use crate::loader::StoneStore;
use crate::progress::ProgressSink;
use crate::soap::StockSource;
use crate::state::AppState;

/// HTTP status for a finished run.
#[must_use]
pub const fn outcome_status(outcome: &SyncOutcome) -> StatusCode {
    if outcome.success {
        return StatusCode::OK;
    }
    match outcome.failure {
        Some(FailureKind::RemoteFetch | FailureKind::Parse | FailureKind::EmptyResult) => {
            StatusCode::BAD_GATEWAY
        }
        Some(FailureKind::Load | FailureKind::Configuration) | None => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Run one sync and answer with its outcome.
///
/// The run is spawned so a dropped connection cannot cancel it halfway
/// through the insert phase.
///
/// # Errors
///
/// Returns `AppError::SyncRunning` (409) if another run is active, or
/// `AppError::Internal` if the run task panicked.
pub async fn trigger<S, D>(
    State(state): State<AppState<S, D>>,
) -> Result<(StatusCode, Json<SyncOutcome>), AppError>
where
    S: StockSource + 'static,
    D: StoneStore + 'static,
{
    let guard = state.try_begin_run().ok_or(AppError::SyncRunning)?;

    let task_state = state.clone();
    let outcome = tokio::spawn(async move {
        let _guard = guard;
        let sink: &dyn ProgressSink = task_state.progress();
        task_state.pipeline().run(Some(sink)).await
    })
    .await
    .map_err(|e| AppError::Internal(format!("sync task failed: {e}")))?;

    Ok((outcome_status(&outcome), Json(outcome)))
}

/// Latest progress event, or `idle` before the first run.
pub async fn status<S: StockSource, D: StoneStore>(
    State(state): State<AppState<S, D>>,
) -> Json<SyncProgress> {
    Json(state.progress().latest())
}
