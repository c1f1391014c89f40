//! HTTP route handlers for the sync service.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (database reachable)
//!
//! # Sync
//! POST /api/sync               - Run one full sync and return its outcome
//! GET  /api/sync/status        - Latest progress event
//! ```

pub mod health;
pub mod sync;

use axum::{
    Router,
    routing::{get, post},
};

use crate::loader::StoneStore;
use crate::soap::StockSource;
use crate::state::AppState;

/// All routes, generic over the pipeline's collaborators.
pub fn routes<S, D>() -> Router<AppState<S, D>>
where
    S: StockSource + 'static,
    D: StoneStore + 'static,
{
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness::<S, D>))
        .route("/api/sync", post(sync::trigger::<S, D>))
        .route("/api/sync/status", get(sync::status::<S, D>))
}
