//! Migrations plus full runs against a real Postgres database.
//!
//! Ignored by default. Run with:
//!
//! ```bash
//! STONES_TEST_DATABASE_URL=postgres://localhost/gemstock_test \
//!     cargo test -p gemstock-integration-tests -- --ignored
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used)]

use gemstock_core::FailureKind;
use gemstock_sync::db::{PgStoneStore, STONES_TABLE, StoneRepository};
use gemstock_sync::pipeline::SyncPipeline;
use gemstock_sync::test_support::{FakeResponse, FakeSource};
use sqlx::PgPool;

async fn pool() -> PgPool {
    let url = std::env::var("STONES_TEST_DATABASE_URL")
        .expect("STONES_TEST_DATABASE_URL must be set for ignored Postgres tests");
    let pool = PgPool::connect(&url).await.unwrap();
    sqlx::migrate!("../sync/migrations").run(&pool).await.unwrap();
    pool
}

// Both scenarios share one table, so they run inside a single test.
#[tokio::test]
#[ignore = "needs STONES_TEST_DATABASE_URL"]
async fn test_replace_then_failed_fetch() {
    let pool = pool().await;

    let pipeline = SyncPipeline::new(
        FakeSource::with_stones(650),
        PgStoneStore::new(pool.clone()),
        300,
    );
    let outcome = pipeline.run(None).await;
    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(outcome.count, 650);

    let overview = StoneRepository::new(&pool).overview().await.unwrap();
    assert_eq!(overview.stone_count, 650);
    assert!(overview.last_synced_at.is_some());

    // Identity restarts on every load
    let (min_id, max_id): (i32, i32) =
        sqlx::query_as(&format!("SELECT MIN(id), MAX(id) FROM {STONES_TABLE}"))
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!((min_id, max_id), (1, 650));

    let (doubled,): (Option<rust_decimal::Decimal>,) = sqlx::query_as(&format!(
        "SELECT total_price FROM {STONES_TABLE} WHERE sku = 'SKU-00001'"
    ))
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(doubled, Some(rust_decimal::Decimal::new(4002, 0)));

    let failing = SyncPipeline::new(
        FakeSource::new(FakeResponse::Empty),
        PgStoneStore::new(pool.clone()),
        300,
    );
    let outcome = failing.run(None).await;
    assert_eq!(outcome.failure, Some(FailureKind::RemoteFetch));

    let overview = StoneRepository::new(&pool).overview().await.unwrap();
    assert_eq!(overview.stone_count, 650);
}
