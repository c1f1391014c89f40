//! Application state shared across handlers.

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::db::PgStoneStore;
use crate::loader::StoneStore;
use crate::pipeline::SyncPipeline;
use crate::progress::LatestProgress;
use crate::soap::{SoapClient, StockSource};

/// State of the production service.
pub type LiveState = AppState<SoapClient, PgStoneStore>;

/// Application state shared across all handlers.
///
/// Cheap to clone; clones share the pipeline, the run lock and the latest
/// progress event.
pub struct AppState<S, D> {
    inner: Arc<AppStateInner<S, D>>,
}

struct AppStateInner<S, D> {
    pipeline: SyncPipeline<S, D>,
    run_lock: Arc<Mutex<()>>,
    progress: LatestProgress,
}

impl<S, D> Clone for AppState<S, D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: StockSource, D: StoneStore> AppState<S, D> {
    #[must_use]
    pub fn new(pipeline: SyncPipeline<S, D>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                pipeline,
                run_lock: Arc::new(Mutex::new(())),
                progress: LatestProgress::new(),
            }),
        }
    }

    #[must_use]
    pub fn pipeline(&self) -> &SyncPipeline<S, D> {
        &self.inner.pipeline
    }

    #[must_use]
    pub fn progress(&self) -> &LatestProgress {
        &self.inner.progress
    }

    /// Claim the single run slot, or `None` if a sync is already running.
    ///
    /// The slot is released when the guard is dropped.
    #[must_use]
    pub fn try_begin_run(&self) -> Option<OwnedMutexGuard<()>> {
        Arc::clone(&self.inner.run_lock).try_lock_owned().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeSource, MemoryStore};

    #[test]
    fn test_single_run_slot() {
        let state = AppState::new(SyncPipeline::new(
            FakeSource::with_stones(1),
            MemoryStore::default(),
            300,
        ));
        let other = state.clone();

        let guard = state.try_begin_run();
        assert!(guard.is_some());
        assert!(other.try_begin_run().is_none());

        drop(guard);
        assert!(other.try_begin_run().is_some());
    }
}
