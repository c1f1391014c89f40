//! The real SOAP client against a local stub service.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use gemstock_core::FailureKind;
use gemstock_integration_tests::{SoapStub, fault_envelope, result_envelope};
use gemstock_sync::pipeline::SyncPipeline;
use gemstock_sync::soap::{RemoteFetchError, SoapClient, StockSource};
use gemstock_sync::test_support::{MemoryStore, stock_xml, stones};

#[tokio::test]
async fn test_request_shape() {
    let stub = SoapStub::start(StatusCode::OK, result_envelope(&stock_xml(2))).await;
    let client = SoapClient::new(stub.config()).unwrap();

    client.fetch_stock().await.unwrap();

    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    let request = requests.first().unwrap();
    assert_eq!(
        request.soap_action.as_deref(),
        Some("\"http://tempuri.org/GetStoneData\"")
    );
    assert!(request.content_type.as_deref().unwrap().starts_with("text/xml"));
    assert!(request.body.contains("<userName>gems &amp; co</userName>"));
    assert!(request.body.contains("<passWord>p&lt;ss&gt;</passWord>"));
    assert!(request.body.contains("<apiKey>key-123</apiKey>"));
}

#[tokio::test]
async fn test_escaped_result_is_unescaped() {
    let xml = stock_xml(3);
    let stub = SoapStub::start(StatusCode::OK, result_envelope(&xml)).await;
    let client = SoapClient::new(stub.config()).unwrap();

    let fetched = client.fetch_stock().await.unwrap();

    assert_eq!(fetched, xml);
}

#[tokio::test]
async fn test_fault_with_server_error_status() {
    let stub = SoapStub::start(
        StatusCode::INTERNAL_SERVER_ERROR,
        fault_envelope("Invalid credentials"),
    )
    .await;
    let client = SoapClient::new(stub.config()).unwrap();

    let err = client.fetch_stock().await.unwrap_err();

    assert!(matches!(err, RemoteFetchError::Fault(ref m) if m == "Invalid credentials"));
}

#[tokio::test]
async fn test_error_status_without_fault() {
    let stub = SoapStub::start(StatusCode::SERVICE_UNAVAILABLE, "maintenance").await;
    let client = SoapClient::new(stub.config()).unwrap();

    let err = client.fetch_stock().await.unwrap_err();

    assert!(matches!(err, RemoteFetchError::Status(503)));
}

#[tokio::test]
async fn test_blank_result_is_empty_response() {
    let stub = SoapStub::start(StatusCode::OK, result_envelope("   ")).await;
    let client = SoapClient::new(stub.config()).unwrap();

    let err = client.fetch_stock().await.unwrap_err();

    assert!(matches!(err, RemoteFetchError::EmptyResponse));
}

#[tokio::test]
async fn test_full_run_through_soap() {
    let stub = SoapStub::start(StatusCode::OK, result_envelope(&stock_xml(650))).await;
    let pipeline = SyncPipeline::new(
        SoapClient::new(stub.config()).unwrap(),
        MemoryStore::default(),
        300,
    );

    let outcome = pipeline.run(None).await;

    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(outcome.count, 650);
    assert_eq!(pipeline.store().chunk_sizes(), vec![300, 300, 50]);
    assert_eq!(stub.requests().len(), 1);
}

#[tokio::test]
async fn test_fault_run_keeps_existing_rows() {
    let stub = SoapStub::start(StatusCode::INTERNAL_SERVER_ERROR, fault_envelope("Quota exceeded")).await;
    let store = MemoryStore::default();
    store.seed(stones(7));
    let pipeline = SyncPipeline::new(SoapClient::new(stub.config()).unwrap(), store, 300);

    let outcome = pipeline.run(None).await;

    assert_eq!(outcome.failure, Some(FailureKind::RemoteFetch));
    assert_eq!(outcome.message, "Failed to fetch stock: SOAP fault: Quota exceeded");
    assert_eq!(pipeline.store().clears(), 0);
    assert_eq!(pipeline.store().row_count(), 7);
}
