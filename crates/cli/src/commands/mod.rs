//! CLI subcommands.

pub mod migrate;
pub mod stats;
pub mod sync;
