//! Sync run phases, progress events, and outcomes.
//!
//! These are the two outbound records of a sync run: a stream of
//! [`SyncProgress`] events for status reporting, and one [`SyncOutcome`]
//! returned to whatever invoked the run.

use serde::{Deserialize, Serialize};

/// Phase of a sync run.
///
/// Runs move strictly forward through
/// `idle → connecting → parsing → processing → clearing → inserting → complete`;
/// `error` is terminal and reachable from any phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    #[default]
    Idle,
    Connecting,
    Parsing,
    Processing,
    Clearing,
    Inserting,
    Complete,
    Error,
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Parsing => "parsing",
            Self::Processing => "processing",
            Self::Clearing => "clearing",
            Self::Inserting => "inserting",
            Self::Complete => "complete",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// A progress event emitted at each phase transition and after each chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncProgress {
    pub phase: SyncPhase,
    /// Percentage, 0 to 100.
    pub progress: u8,
    pub detail: String,
    pub total_stones: usize,
    pub processed_stones: usize,
}

impl SyncProgress {
    /// Create a progress event. Percentages above 100 are clamped.
    #[must_use]
    pub fn new(phase: SyncPhase, progress: u8, detail: impl Into<String>) -> Self {
        Self {
            phase,
            progress: progress.min(100),
            detail: detail.into(),
            total_stones: 0,
            processed_stones: 0,
        }
    }

    /// Attach stone counts.
    #[must_use]
    pub fn with_counts(mut self, processed: usize, total: usize) -> Self {
        self.processed_stones = processed;
        self.total_stones = total;
        self
    }

    /// The event reported before any run has happened.
    #[must_use]
    pub fn idle() -> Self {
        Self::new(SyncPhase::Idle, 0, "No sync has run yet")
    }
}

/// Which stage a failed run stopped in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The SOAP call failed or returned nothing. No data was touched.
    RemoteFetch,
    /// The XML was malformed. No data was touched.
    Parse,
    /// The XML held no stones. No data was touched.
    EmptyResult,
    /// Clearing the table or inserting a chunk failed.
    Load,
    /// Credentials or connection settings were missing.
    Configuration,
}

/// Result of a sync run.
///
/// Serializes as `{ success, count, message }`. The failure kind is kept out
/// of the wire shape and is only used by callers to pick a status code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub success: bool,
    pub count: usize,
    pub message: String,
    #[serde(skip)]
    pub failure: Option<FailureKind>,
}

impl SyncOutcome {
    /// A successful run that persisted `count` stones.
    #[must_use]
    pub fn succeeded(count: usize) -> Self {
        Self {
            success: true,
            count,
            message: format!("Synced {count} stones"),
            failure: None,
        }
    }

    /// A failed run.
    #[must_use]
    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            count: 0,
            message: message.into(),
            failure: Some(kind),
        }
    }
}
