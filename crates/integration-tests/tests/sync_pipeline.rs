//! Full sync runs over in-memory collaborators.
//!
//! These tests drive the public pipeline API the way the service and the
//! CLI do, without network or database access.

#![allow(clippy::unwrap_used)]

use std::sync::Mutex;

use gemstock_core::{FailureKind, StoneColumn, SyncPhase, SyncProgress};
use gemstock_sync::pipeline::SyncPipeline;
use gemstock_sync::test_support::{FakeResponse, FakeSource, MemoryStore, sku, stones};
use rust_decimal::Decimal;

// =============================================================================
// Successful runs
// =============================================================================

#[tokio::test]
async fn test_650_stones_in_chunks_of_300() {
    let store = MemoryStore::default();
    store.seed(stones(5));
    let pipeline = SyncPipeline::new(FakeSource::with_stones(650), store, 300);
    let events = Mutex::new(Vec::<SyncProgress>::new());
    let sink = |p: &SyncProgress| events.lock().unwrap().push(p.clone());

    let outcome = pipeline.run(Some(&sink)).await;

    assert!(outcome.success);
    assert_eq!(outcome.count, 650);
    assert_eq!(pipeline.store().clears(), 1);
    assert_eq!(pipeline.store().chunk_sizes(), vec![300, 300, 50]);
    assert_eq!(pipeline.store().row_count(), 650);

    let skus = pipeline.store().skus();
    assert_eq!(skus.first(), Some(&sku(1)));
    assert_eq!(skus.last(), Some(&sku(650)));

    let events = events.into_inner().unwrap();
    let inserting: Vec<_> = events
        .iter()
        .filter(|e| e.phase == SyncPhase::Inserting)
        .map(|e| (e.processed_stones, e.total_stones))
        .collect();
    assert_eq!(inserting, vec![(300, 650), (600, 650), (650, 650)]);
    assert_eq!(events.last().unwrap().phase, SyncPhase::Complete);
}

#[tokio::test]
async fn test_single_stone_is_wrapped_and_mapped() {
    let xml = r#"<?xml version="1.0"?>
<Stock>
  <Stone>
    <SKU>LONE-1</SKU>
    <Weight>2.01</Weight>
    <PricePerCarat>1500.25</PricePerCarat>
    <TotalPrice>3015.50</TotalPrice>
    <Rap.Price>4000</Rap.Price>
    <Branch> ny </Branch>
    <Image></Image>
    <Comment>  two  spaces  </Comment>
  </Stone>
</Stock>"#;
    let pipeline = SyncPipeline::new(FakeSource::xml(xml), MemoryStore::default(), 300);

    let outcome = pipeline.run(None).await;

    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(outcome.count, 1);
    assert_eq!(pipeline.store().chunk_sizes(), vec![1]);
    assert_eq!(pipeline.store().skus(), vec!["LONE-1".to_string()]);

    let rows = pipeline.store().rows();
    let stone = rows.first().unwrap();
    assert_eq!(stone.text(StoneColumn::Branch), Some("New York"));
    assert_eq!(stone.number(StoneColumn::Weight), Some(Decimal::new(201, 2)));
    assert_eq!(stone.number(StoneColumn::RapPrice), Some(Decimal::new(4000, 0)));
    assert_eq!(stone.number(StoneColumn::TotalPrice), Some(Decimal::new(6031, 0)));
    assert_eq!(stone.text(StoneColumn::Image), Some(""));
    assert_eq!(stone.text(StoneColumn::Comment), Some("  two  spaces  "));
    assert!(stone.get(StoneColumn::Clarity).is_null());
    assert!(stone.timestamp(StoneColumn::CreatedAt).is_some());
    assert_eq!(
        stone.timestamp(StoneColumn::CreatedAt),
        stone.timestamp(StoneColumn::UpdatedAt)
    );
}

#[tokio::test]
async fn test_price_doubling_reaches_the_store() {
    let xml = "<Stock><Stone><SKU>P-1</SKU><PricePerCarat>100.5</PricePerCarat>\
               <TotalPrice>201</TotalPrice><Weight>2</Weight></Stone></Stock>";
    let pipeline = SyncPipeline::new(FakeSource::xml(xml), MemoryStore::default(), 300);

    assert!(pipeline.run(None).await.success);

    let rows = pipeline.store().rows();
    let stone = rows.first().unwrap();
    assert_eq!(stone.number(StoneColumn::PricePerCarat), Some(Decimal::new(201, 0)));
    assert_eq!(stone.number(StoneColumn::TotalPrice), Some(Decimal::new(402, 0)));
    assert_eq!(stone.number(StoneColumn::Weight), Some(Decimal::new(2, 0)));
    assert!(stone.get(StoneColumn::RawXml).is_null());
}

// =============================================================================
// Failures before the table is touched
// =============================================================================

#[tokio::test]
async fn test_fetch_failures_do_not_truncate() {
    for response in [
        FakeResponse::Empty,
        FakeResponse::Fault("Server was unable to process request".to_string()),
    ] {
        let store = MemoryStore::default();
        store.seed(stones(4));
        let pipeline = SyncPipeline::new(FakeSource::new(response), store, 300);

        let outcome = pipeline.run(None).await;

        assert!(!outcome.success);
        assert_eq!(outcome.count, 0);
        assert_eq!(outcome.failure, Some(FailureKind::RemoteFetch));
        assert_eq!(pipeline.store().clears(), 0);
        assert_eq!(pipeline.store().row_count(), 4);
    }
}

#[tokio::test]
async fn test_documents_without_stones_do_not_truncate() {
    for xml in [
        "<Stock/>",
        "<Stock></Stock>",
        "<Export><Stone><SKU>X</SKU></Stone></Export>",
    ] {
        let store = MemoryStore::default();
        store.seed(stones(4));
        let pipeline = SyncPipeline::new(FakeSource::xml(xml), store, 300);

        let outcome = pipeline.run(None).await;

        assert_eq!(outcome.failure, Some(FailureKind::EmptyResult), "{xml}");
        assert_eq!(pipeline.store().clears(), 0);
        assert_eq!(pipeline.store().row_count(), 4);
    }
}

// =============================================================================
// Failures during the load
// =============================================================================

#[tokio::test]
async fn test_second_chunk_failure_leaves_first_chunk() {
    let store = MemoryStore::failing_on_chunk(2);
    store.seed(stones(900));
    let pipeline = SyncPipeline::new(FakeSource::with_stones(650), store, 300);

    let outcome = pipeline.run(None).await;

    assert!(!outcome.success);
    assert_eq!(outcome.failure, Some(FailureKind::Load));
    assert!(outcome.message.contains("chunk 2/3 after 300 stones"));
    assert_eq!(pipeline.store().clears(), 1);
    assert_eq!(pipeline.store().row_count(), 300);
    assert_eq!(pipeline.store().skus().last(), Some(&sku(300)));
}

#[tokio::test]
async fn test_clear_failure_is_a_load_failure() {
    let pipeline = SyncPipeline::new(FakeSource::with_stones(3), MemoryStore::failing_clear(), 300);

    let outcome = pipeline.run(None).await;

    assert_eq!(outcome.failure, Some(FailureKind::Load));
    assert!(outcome.message.starts_with("Failed to load stones: Failed to clear stone table"));
    assert!(pipeline.store().chunk_sizes().is_empty());
}
