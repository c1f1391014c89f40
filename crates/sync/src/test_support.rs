//! In-memory fakes for the pipeline's collaborators.
//!
//! Compiled for unit tests and, with the `test-support` feature, for the
//! integration test crate.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use gemstock_core::NormalizedStone;

use crate::db::RepositoryError;
use crate::loader::StoneStore;
use crate::mapper::map_stone;
use crate::soap::{RemoteFetchError, StockSource};
use crate::xml::RawStone;

// =============================================================================
// Fixtures
// =============================================================================

/// SKU of the `n`th synthetic stone, counting from 1.
#[must_use]
pub fn sku(n: usize) -> String {
    format!("SKU-{n:05}")
}

/// A stock document with `count` synthetic stones.
#[must_use]
pub fn stock_xml(count: usize) -> String {
    let mut xml = String::from(r#"<?xml version="1.0" encoding="utf-8"?><Stock>"#);
    for n in 1..=count {
        xml.push_str(&format!(
            "<Stone><Category>Diamonds</Category><SKU>{}</SKU><Shape>Round</Shape>\
             <Weight>1.{:02}</Weight><Color>G</Color><Clarity>VS2</Clarity>\
             <PricePerCarat>{}</PricePerCarat><TotalPrice>{}</TotalPrice>\
             <Branch>hk</Branch></Stone>",
            sku(n),
            n % 100,
            1000 + n,
            2000 + n,
        ));
    }
    xml.push_str("</Stock>");
    xml
}

/// `count` mapped stones with SKUs `SKU-00001..`.
///
/// # Panics
///
/// Never in practice; the field map always matches the schema.
#[must_use]
#[allow(clippy::expect_used)]
pub fn stones(count: usize) -> Vec<NormalizedStone> {
    let synced_at = Utc::now();
    (1..=count)
        .map(|n| {
            map_stone(&RawStone::from_pairs([("SKU", sku(n))]), synced_at)
                .expect("field map matches schema")
                .stone
        })
        .collect()
}

// =============================================================================
// Stock source
// =============================================================================

/// What a [`FakeSource`] answers with.
#[derive(Debug, Clone)]
pub enum FakeResponse {
    Xml(String),
    Fault(String),
    Empty,
}

/// A [`StockSource`] returning a canned response.
#[derive(Debug)]
pub struct FakeSource {
    response: FakeResponse,
    calls: AtomicUsize,
}

impl FakeSource {
    #[must_use]
    pub const fn new(response: FakeResponse) -> Self {
        Self {
            response,
            calls: AtomicUsize::new(0),
        }
    }

    /// A source returning `xml`.
    #[must_use]
    pub fn xml(xml: impl Into<String>) -> Self {
        Self::new(FakeResponse::Xml(xml.into()))
    }

    /// A source returning a stock document with `count` stones.
    #[must_use]
    pub fn with_stones(count: usize) -> Self {
        Self::xml(stock_xml(count))
    }

    /// Number of fetches made.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl StockSource for FakeSource {
    async fn fetch_stock(&self) -> Result<String, RemoteFetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.response {
            FakeResponse::Xml(xml) => Ok(xml.clone()),
            FakeResponse::Fault(message) => Err(RemoteFetchError::Fault(message.clone())),
            FakeResponse::Empty => Err(RemoteFetchError::EmptyResponse),
        }
    }
}

// =============================================================================
// Stone store
// =============================================================================

#[derive(Debug, Default)]
struct StoreState {
    rows: Vec<NormalizedStone>,
    clears: usize,
    chunk_sizes: Vec<usize>,
    attempts: usize,
}

/// A [`StoneStore`] keeping rows in memory and recording every call.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
    fail_clear: bool,
    fail_on_chunk: Option<usize>,
    unreachable: bool,
}

impl MemoryStore {
    /// A store whose `clear` always fails.
    #[must_use]
    pub fn failing_clear() -> Self {
        Self {
            fail_clear: true,
            ..Self::default()
        }
    }

    /// A store whose `chunk`th insert (counting from 1) fails.
    #[must_use]
    pub fn failing_on_chunk(chunk: usize) -> Self {
        Self {
            fail_on_chunk: Some(chunk),
            ..Self::default()
        }
    }

    /// A store whose `ping` fails.
    #[must_use]
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Put rows in place as if a previous sync had loaded them.
    pub fn seed(&self, rows: Vec<NormalizedStone>) {
        self.state().rows = rows;
    }

    /// Number of `clear` calls that succeeded.
    #[must_use]
    pub fn clears(&self) -> usize {
        self.state().clears
    }

    /// Sizes of the chunks inserted, in order.
    #[must_use]
    pub fn chunk_sizes(&self) -> Vec<usize> {
        self.state().chunk_sizes.clone()
    }

    /// Rows currently stored.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.state().rows.len()
    }

    /// Copy of the rows currently stored, in insert order.
    #[must_use]
    pub fn rows(&self) -> Vec<NormalizedStone> {
        self.state().rows.clone()
    }

    /// SKUs currently stored, in insert order.
    #[must_use]
    pub fn skus(&self) -> Vec<String> {
        self.state()
            .rows
            .iter()
            .filter_map(|row| row.sku().map(str::to_string))
            .collect()
    }
}

impl StoneStore for MemoryStore {
    async fn clear(&self) -> Result<(), RepositoryError> {
        if self.fail_clear {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut state = self.state();
        state.rows.clear();
        state.clears += 1;
        Ok(())
    }

    async fn insert_chunk(&self, stones: &[NormalizedStone]) -> Result<u64, RepositoryError> {
        let mut state = self.state();
        state.attempts += 1;
        if self.fail_on_chunk == Some(state.attempts) {
            return Err(RepositoryError::Conflict(
                "value too long for type character varying(255)".to_string(),
            ));
        }
        state.rows.extend_from_slice(stones);
        state.chunk_sizes.push(stones.len());
        Ok(stones.len() as u64)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        if self.unreachable {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}
