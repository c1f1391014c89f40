//! Unified error handling for the sync service.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;

/// Application-level error type for the HTTP surface.
///
/// Sync failures are not errors at this level: a finished run, successful or
/// not, is answered with its `SyncOutcome`.
#[derive(Debug, Error)]
pub enum AppError {
    /// Another sync holds the run lock.
    #[error("A sync is already running")]
    SyncRunning,

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::SyncRunning => StatusCode::CONFLICT,
            Self::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if matches!(self, Self::Database(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Sync request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::SyncRunning => self.to_string(),
        };

        let body = serde_json::json!({
            "success": false,
            "count": 0,
            "message": message,
        });
        (self.status(), Json(body)).into_response()
    }
}
