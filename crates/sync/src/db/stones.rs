//! Stone inventory repository.
//!
//! Writes go through [`PgStoneStore`], the `PostgreSQL` [`StoneStore`] used by
//! the bulk loader. Reads go through [`StoneRepository`].
//!
//! The insert statement is built at runtime with `QueryBuilder` because its
//! row count varies per chunk.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;

use gemstock_core::{ColumnValue, NormalizedStone, StoneColumn};

use super::RepositoryError;
use crate::loader::StoneStore;

/// Destination table of every sync run.
pub const STONES_TABLE: &str = "soap_stones";

// =============================================================================
// Bulk store
// =============================================================================

/// `PostgreSQL`-backed [`StoneStore`].
///
/// Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct PgStoneStore {
    pool: PgPool,
}

impl PgStoneStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Build the multi-row insert for one chunk.
fn insert_statement(stones: &[NormalizedStone]) -> QueryBuilder<'static, Postgres> {
    let mut qb: QueryBuilder<'static, Postgres> = QueryBuilder::new(format!(
        "INSERT INTO {STONES_TABLE} ({}) ",
        StoneColumn::sql_column_list()
    ));
    qb.push_values(stones, |mut b, stone| {
        for value in stone.values() {
            match value {
                ColumnValue::Text(v) => b.push_bind(v.clone()),
                ColumnValue::Numeric(v) => b.push_bind(*v),
                ColumnValue::Timestamp(v) => b.push_bind(*v),
            };
        }
    });
    qb
}

impl StoneStore for PgStoneStore {
    #[instrument(skip(self))]
    async fn clear(&self) -> Result<(), RepositoryError> {
        sqlx::query(&format!("TRUNCATE TABLE {STONES_TABLE} RESTART IDENTITY"))
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from_sqlx)?;
        Ok(())
    }

    #[instrument(skip(self, stones), fields(rows = stones.len()))]
    async fn insert_chunk(&self, stones: &[NormalizedStone]) -> Result<u64, RepositoryError> {
        if stones.is_empty() {
            return Ok(0);
        }
        let result = insert_statement(stones)
            .build()
            .persistent(false)
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from_sqlx)?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}

// =============================================================================
// Read model
// =============================================================================

/// Inventory summary shown to operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryOverview {
    pub stone_count: i64,
    /// Timestamp of the last completed load, if the table is not empty.
    pub last_synced_at: Option<DateTime<Utc>>,
}

#[derive(Debug, sqlx::FromRow)]
struct OverviewRow {
    stone_count: i64,
    last_synced_at: Option<DateTime<Utc>>,
}

/// Read access to the stone table.
pub struct StoneRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StoneRepository<'a> {
    /// Create a new stone repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Count stones and find the latest sync time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn overview(&self) -> Result<InventoryOverview, RepositoryError> {
        let row: OverviewRow = sqlx::query_as(&format!(
            "SELECT COUNT(*) AS stone_count, MAX(created_at) AS last_synced_at FROM {STONES_TABLE}"
        ))
        .fetch_one(self.pool)
        .await?;

        Ok(InventoryOverview {
            stone_count: row.stone_count,
            last_synced_at: row.last_synced_at,
        })
    }
}
