//! Sync orchestrator.
//!
//! Runs one full-table sync: fetch, parse, map, load. Every stage error is
//! caught here and turned into a failed [`SyncOutcome`]; [`SyncPipeline::run`]
//! never returns an error.
//!
//! ```text
//! idle -> connecting -> parsing -> processing -> clearing -> inserting(1..N) -> complete
//!                  \___________\____________\___________\______________\-> error
//! ```
//!
//! Failures up to and including `clearing` leave the stored stones untouched.
//! Failures during `inserting` leave the table partially loaded.

use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use thiserror::Error;
use tracing::Instrument;
use uuid::Uuid;

use gemstock_core::{
    FailureKind, NormalizedStone, SchemaError, SyncOutcome, SyncPhase, SyncProgress,
};

use crate::config::ConfigError;
use crate::loader::{BulkLoader, LoadError, StoneStore};
use crate::mapper::map_stone;
use crate::progress::{ProgressSink, TracingProgress};
use crate::soap::{RemoteFetchError, StockSource};
use crate::xml::{ExtractError, XmlError, extract_stones};

/// Progress reported when each early phase starts.
pub const CONNECTING_PROGRESS: u8 = 5;
pub const PARSING_PROGRESS: u8 = 15;
pub const PROCESSING_PROGRESS: u8 = 25;
pub const COMPLETE_PROGRESS: u8 = 100;

// =============================================================================
// Errors
// =============================================================================

/// Why a sync run stopped.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The stock export could not be fetched. Nothing was changed.
    #[error("Failed to fetch stock: {0}")]
    RemoteFetch(#[from] RemoteFetchError),

    /// The stock export was not valid XML. Nothing was changed.
    #[error("Failed to parse stock XML: {0}")]
    Parse(#[source] XmlError),

    /// The stock export held no stones. Nothing was changed.
    #[error("No stones found in stock export")]
    EmptyResult,

    /// Mapped rows did not fit the column schema. Nothing was changed.
    #[error("Failed to process stones: {0}")]
    Mapping(#[from] SchemaError),

    /// Loading failed after the table was cleared.
    #[error("Failed to load stones: {0}")]
    Load(#[from] LoadError),

    /// Required settings were missing or invalid. Nothing was attempted.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

impl From<ExtractError> for SyncError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::Parse(e) => Self::Parse(e),
            ExtractError::EmptyResult => Self::EmptyResult,
        }
    }
}

impl SyncError {
    /// Stage classification used for status codes and reporting.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::RemoteFetch(_) => FailureKind::RemoteFetch,
            Self::Parse(_) | Self::Mapping(_) => FailureKind::Parse,
            Self::EmptyResult => FailureKind::EmptyResult,
            Self::Load(_) => FailureKind::Load,
            Self::Configuration(_) => FailureKind::Configuration,
        }
    }

    /// Whether the stone table was changed before the run stopped.
    ///
    /// A failed clear leaves the table as it was; a failed chunk leaves it
    /// truncated and partially loaded.
    #[must_use]
    pub const fn touched_data(&self) -> bool {
        matches!(self, Self::Load(LoadError::Chunk { .. }))
    }

    /// The failure-shaped outcome for this error.
    #[must_use]
    pub fn into_outcome(self) -> SyncOutcome {
        SyncOutcome::failed(self.kind(), self.to_string())
    }
}

// =============================================================================
// Progress fan-out
// =============================================================================

/// Sends events to `tracing` and the caller's sink, remembering the last one
/// so the `error` event can repeat its percentage and counts.
struct Reporter<'a> {
    sink: Option<&'a dyn ProgressSink>,
    last: Mutex<SyncProgress>,
}

impl<'a> Reporter<'a> {
    fn new(sink: Option<&'a dyn ProgressSink>) -> Self {
        Self {
            sink,
            last: Mutex::new(SyncProgress::idle()),
        }
    }

    fn phase(&self, phase: SyncPhase, progress: u8, detail: impl Into<String>) {
        self.report(&SyncProgress::new(phase, progress, detail));
    }

    fn error(&self, detail: impl Into<String>) {
        let last = self
            .last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        self.report(
            &SyncProgress::new(SyncPhase::Error, last.progress, detail)
                .with_counts(last.processed_stones, last.total_stones),
        );
    }
}

impl ProgressSink for Reporter<'_> {
    fn report(&self, progress: &SyncProgress) {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = progress.clone();
        TracingProgress.report(progress);
        if let Some(sink) = self.sink {
            sink.report(progress);
        }
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// One configured sync pipeline.
///
/// Owns its collaborators; nothing is read from process-wide state.
#[derive(Debug)]
pub struct SyncPipeline<S, D> {
    source: S,
    store: D,
    chunk_size: usize,
}

impl<S: StockSource, D: StoneStore> SyncPipeline<S, D> {
    #[must_use]
    pub const fn new(source: S, store: D, chunk_size: usize) -> Self {
        Self {
            source,
            store,
            chunk_size,
        }
    }

    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    #[must_use]
    pub const fn store(&self) -> &D {
        &self.store
    }

    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Run one sync.
    ///
    /// Never fails: errors are logged, reported as an `error` event and
    /// returned as a failed outcome. Callers must not run two syncs against
    /// the same store at once.
    pub async fn run(&self, sink: Option<&dyn ProgressSink>) -> SyncOutcome {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("stone_sync", %run_id);
        let reporter = Reporter::new(sink);

        async {
            match self.execute(&reporter).await {
                Ok(count) => {
                    reporter.report(
                        &SyncProgress::new(
                            SyncPhase::Complete,
                            COMPLETE_PROGRESS,
                            format!("Synced {count} stones"),
                        )
                        .with_counts(count, count),
                    );
                    SyncOutcome::succeeded(count)
                }
                Err(err) => {
                    let kind = err.kind();
                    if err.touched_data() {
                        tracing::error!(error = %err, ?kind, "Sync failed; stone table is partially loaded");
                    } else {
                        tracing::error!(error = %err, ?kind, "Sync failed; stored stones unchanged");
                    }
                    reporter.error(err.to_string());
                    err.into_outcome()
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, reporter: &Reporter<'_>) -> Result<usize, SyncError> {
        reporter.phase(
            SyncPhase::Connecting,
            CONNECTING_PROGRESS,
            "Fetching stock from inventory service",
        );
        let xml = self.source.fetch_stock().await?;

        reporter.phase(SyncPhase::Parsing, PARSING_PROGRESS, "Parsing stock XML");
        let raw = extract_stones(&xml)?;
        drop(xml);

        reporter.report(
            &SyncProgress::new(
                SyncPhase::Processing,
                PROCESSING_PROGRESS,
                format!("Processing {} stones", raw.len()),
            )
            .with_counts(0, raw.len()),
        );
        let stones = map_all(&raw)?;

        let report = BulkLoader::new(&self.store, self.chunk_size)
            .load(&stones, reporter)
            .await?;
        Ok(report.inserted)
    }
}

/// Map every raw stone with one shared timestamp, logging warnings.
fn map_all(raw: &[crate::xml::RawStone]) -> Result<Vec<NormalizedStone>, SchemaError> {
    let synced_at = Utc::now();
    let mut stones = Vec::with_capacity(raw.len());
    let mut warnings = 0_usize;

    for item in raw {
        let mapped = map_stone(item, synced_at)?;
        for warning in &mapped.warnings {
            tracing::warn!(
                sku = warning.sku.as_deref().unwrap_or_default(),
                column = %warning.column,
                "{}",
                warning.problem
            );
        }
        warnings += mapped.warnings.len();
        stones.push(mapped.stone);
    }

    if warnings > 0 {
        tracing::info!(warnings, stones = stones.len(), "Mapped stones with field warnings");
    }
    Ok(stones)
}
