//! Gemstock Core - Shared types library.
//!
//! This crate provides common types used across all Gemstock components:
//! - `sync` - Inventory ingestion pipeline and its HTTP trigger
//! - `cli` - Command-line tools for migrations, one-off syncs and stats
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - The 40-column stone schema, sync progress events and outcomes

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
