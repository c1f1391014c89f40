//! Chunked bulk loader.
//!
//! Replaces the full contents of the stone table:
//!
//! 1. clear the table and reset its identity sequence
//! 2. split the batch into chunks of at most `chunk_size` rows
//! 3. insert each chunk with one multi-row statement, in input order
//! 4. report progress after each chunk
//!
//! There is no transaction across chunks. If chunk *k* fails, the table holds
//! the rows of chunks `1..k` and nothing older; [`LoadError::Chunk`] records
//! how far the load got.

use std::future::Future;

use gemstock_core::{NormalizedStone, SyncPhase, SyncProgress};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::progress::ProgressSink;

/// Progress reported while clearing.
pub const CLEARING_PROGRESS: u8 = 30;

/// Progress range covered by the insert phase.
pub const INSERT_PROGRESS_START: u8 = 30;
pub const INSERT_PROGRESS_END: u8 = 95;

/// Destination of a bulk load.
pub trait StoneStore: Send + Sync {
    /// Delete every row and reset the identity sequence.
    fn clear(&self) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Insert one chunk with a single statement, returning the rows affected.
    fn insert_chunk(
        &self,
        stones: &[NormalizedStone],
    ) -> impl Future<Output = Result<u64, RepositoryError>> + Send;

    /// Check that the store is reachable.
    fn ping(&self) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Errors that can occur during a bulk load.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Clearing failed; the table is unchanged.
    #[error("Failed to clear stone table: {0}")]
    Clear(#[source] RepositoryError),

    /// A chunk insert failed after the table was cleared.
    #[error("Failed to insert chunk {chunk}/{chunks} after {inserted} stones: {source}")]
    Chunk {
        chunk: usize,
        chunks: usize,
        inserted: usize,
        #[source]
        source: RepositoryError,
    },
}

impl LoadError {
    /// Stones left in the table after the failure.
    #[must_use]
    pub const fn stones_written(&self) -> usize {
        match self {
            Self::Clear(_) => 0,
            Self::Chunk { inserted, .. } => *inserted,
        }
    }
}

/// Result of a completed load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub inserted: usize,
    pub chunks: usize,
}

/// Percentage for `processed` of `total` stones within the insert range.
#[must_use]
pub fn insert_progress(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return INSERT_PROGRESS_END;
    }
    let span = usize::from(INSERT_PROGRESS_END - INSERT_PROGRESS_START);
    let step = span * processed.min(total) / total;
    INSERT_PROGRESS_START.saturating_add(u8::try_from(step).unwrap_or(u8::MAX))
}

/// Full-table replace over a [`StoneStore`].
pub struct BulkLoader<'a, D> {
    store: &'a D,
    chunk_size: usize,
}

impl<'a, D: StoneStore> BulkLoader<'a, D> {
    /// Create a loader. A chunk size of zero is treated as one.
    #[must_use]
    pub fn new(store: &'a D, chunk_size: usize) -> Self {
        Self {
            store,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Replace the table contents with `stones`.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::Clear` if the table could not be cleared, or
    /// `LoadError::Chunk` for the first chunk that failed to insert.
    pub async fn load(
        &self,
        stones: &[NormalizedStone],
        sink: &dyn ProgressSink,
    ) -> Result<LoadReport, LoadError> {
        let total = stones.len();
        let chunks = total.div_ceil(self.chunk_size);

        sink.report(
            &SyncProgress::new(
                SyncPhase::Clearing,
                CLEARING_PROGRESS,
                "Clearing existing stones",
            )
            .with_counts(0, total),
        );
        self.store.clear().await.map_err(LoadError::Clear)?;
        tracing::info!(total, chunks, chunk_size = self.chunk_size, "Stone table cleared");

        let mut inserted = 0;
        for (index, chunk) in stones.chunks(self.chunk_size).enumerate() {
            let number = index + 1;
            let affected = self
                .store
                .insert_chunk(chunk)
                .await
                .map_err(|source| LoadError::Chunk {
                    chunk: number,
                    chunks,
                    inserted,
                    source,
                })?;
            if usize::try_from(affected).ok() != Some(chunk.len()) {
                tracing::warn!(chunk = number, rows = chunk.len(), affected, "Row count mismatch");
            }
            inserted += chunk.len();

            sink.report(
                &SyncProgress::new(
                    SyncPhase::Inserting,
                    insert_progress(inserted, total),
                    format!("Inserted chunk {number}/{chunks} ({inserted}/{total} stones)"),
                )
                .with_counts(inserted, total),
            );
        }

        Ok(LoadReport { inserted, chunks })
    }
}
