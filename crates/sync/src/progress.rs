//! Progress reporting.
//!
//! The pipeline emits a [`SyncProgress`] event at every phase transition and
//! after every inserted chunk. Events always go to `tracing`; callers may pass
//! an extra [`ProgressSink`] to observe them.

use std::sync::{Arc, PoisonError, RwLock};

use gemstock_core::SyncProgress;

/// Receives progress events from a sync run.
pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: &SyncProgress);
}

impl<F> ProgressSink for F
where
    F: Fn(&SyncProgress) + Send + Sync,
{
    fn report(&self, progress: &SyncProgress) {
        self(progress);
    }
}

/// Logs each event at `info`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn report(&self, progress: &SyncProgress) {
        tracing::info!(
            phase = %progress.phase,
            progress = progress.progress,
            processed = progress.processed_stones,
            total = progress.total_stones,
            "{}",
            progress.detail
        );
    }
}

/// Keeps the most recent event for status polling.
///
/// Clones share the same slot.
#[derive(Debug, Clone)]
pub struct LatestProgress {
    slot: Arc<RwLock<SyncProgress>>,
}

impl Default for LatestProgress {
    fn default() -> Self {
        Self {
            slot: Arc::new(RwLock::new(SyncProgress::idle())),
        }
    }
}

impl LatestProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent event, or `idle` if nothing has been reported.
    #[must_use]
    pub fn latest(&self) -> SyncProgress {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ProgressSink for LatestProgress {
    fn report(&self, progress: &SyncProgress) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = progress.clone();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use gemstock_core::SyncPhase;

    use super::*;

    #[test]
    fn test_closure_sink() {
        let seen = Mutex::new(Vec::new());
        let sink = |p: &SyncProgress| seen.lock().unwrap().push(p.phase);

        sink.report(&SyncProgress::new(SyncPhase::Connecting, 5, "Connecting"));
        sink.report(&SyncProgress::new(SyncPhase::Parsing, 15, "Parsing"));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![SyncPhase::Connecting, SyncPhase::Parsing]
        );
    }

    #[test]
    fn test_latest_progress_starts_idle() {
        let latest = LatestProgress::new();
        assert_eq!(latest.latest().phase, SyncPhase::Idle);
    }

    #[test]
    fn test_latest_progress_shared_between_clones() {
        let latest = LatestProgress::new();
        let writer = latest.clone();

        writer.report(
            &SyncProgress::new(SyncPhase::Inserting, 62, "Inserted chunk 1/2").with_counts(300, 650),
        );

        let current = latest.latest();
        assert_eq!(current.phase, SyncPhase::Inserting);
        assert_eq!(current.processed_stones, 300);
        assert_eq!(current.total_stones, 650);
    }
}
