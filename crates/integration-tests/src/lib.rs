//! Integration tests for Gemstock.
//!
//! # Running Tests
//!
//! ```bash
//! # Pipeline and SOAP tests (no external services)
//! cargo test -p gemstock-integration-tests
//!
//! # Include the Postgres round trip
//! STONES_TEST_DATABASE_URL=postgres://localhost/gemstock_test \
//!     cargo test -p gemstock-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `sync_pipeline` - Full runs over in-memory fakes
//! - `soap_service` - The real SOAP client against a local stub service
//! - `postgres_roundtrip` - Migrations plus a full run against Postgres

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};
use gemstock_sync::config::{DEFAULT_SOAP_NAMESPACE, SoapConfig};
use secrecy::SecretString;
use url::Url;

/// Path the stub service answers on.
pub const STUB_PATH: &str = "/StockService.asmx";

/// One request received by the stub service.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub soap_action: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Debug)]
struct StubState {
    status: StatusCode,
    body: String,
    requests: Mutex<Vec<CapturedRequest>>,
}

/// A local HTTP service answering every POST with a canned SOAP response.
#[derive(Debug)]
pub struct SoapStub {
    pub url: Url,
    state: Arc<StubState>,
}

impl SoapStub {
    /// Start the stub on an ephemeral port.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    #[allow(clippy::unwrap_used)]
    pub async fn start(status: StatusCode, body: impl Into<String>) -> Self {
        let state = Arc::new(StubState {
            status,
            body: body.into(),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route(STUB_PATH, post(answer))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let url = Url::parse(&format!("http://{addr}{STUB_PATH}")).unwrap();
        Self { url, state }
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.state
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Client settings pointing at this stub.
    #[must_use]
    pub fn config(&self) -> SoapConfig {
        SoapConfig {
            endpoint: self.url.clone(),
            namespace: DEFAULT_SOAP_NAMESPACE.to_string(),
            username: "gems & co".to_string(),
            password: SecretString::from("p<ss>"),
            api_key: SecretString::from("key-123"),
            timeout: Duration::from_secs(5),
        }
    }
}

async fn answer(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };
    state
        .requests
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(CapturedRequest {
            soap_action: header("soapaction"),
            content_type: header("content-type"),
            body,
        });
    (state.status, state.body.clone())
}

/// A `GetStoneData` response carrying `stock_xml` as an escaped string.
#[must_use]
pub fn result_envelope(stock_xml: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <GetStoneDataResponse xmlns="{DEFAULT_SOAP_NAMESPACE}">
      <GetStoneDataResult>{}</GetStoneDataResult>
    </GetStoneDataResponse>
  </soap:Body>
</soap:Envelope>"#,
        quick_xml::escape::escape(stock_xml)
    )
}

/// A SOAP 1.1 fault response.
#[must_use]
pub fn fault_envelope(message: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <soap:Fault>
      <faultcode>soap:Client</faultcode>
      <faultstring>{}</faultstring>
    </soap:Fault>
  </soap:Body>
</soap:Envelope>"#,
        quick_xml::escape::escape(message)
    )
}
