//! Core types for Gemstock.
//!
//! This module provides the stone column schema and the records a sync run
//! produces.

pub mod stone;
pub mod sync;

pub use stone::{ColumnKind, ColumnValue, NormalizedStone, STONE_COLUMN_COUNT, SchemaError, StoneColumn};
pub use sync::{FailureKind, SyncOutcome, SyncPhase, SyncProgress};
