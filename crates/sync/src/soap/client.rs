//! Inventory SOAP service client.
//!
//! Provides the single `GetStoneData` call the sync pipeline depends on.

use std::sync::Arc;

use reqwest::header::{CONTENT_TYPE, HeaderValue};
use tracing::instrument;

use super::envelope::{SoapResponse, build_request, parse_response, soap_action};
use super::{RemoteFetchError, StockSource};
use crate::config::SoapConfig;

/// Inventory SOAP service client.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct SoapClient {
    inner: Arc<SoapClientInner>,
}

struct SoapClientInner {
    client: reqwest::Client,
    config: SoapConfig,
}

impl SoapClient {
    /// Create a new client for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns `RemoteFetchError::Http` if the HTTP client cannot be built.
    pub fn new(config: SoapConfig) -> Result<Self, RemoteFetchError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            inner: Arc::new(SoapClientInner { client, config }),
        })
    }

    /// The configured service endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.inner.config.endpoint.as_str()
    }

    /// Call `GetStoneData` and return the stock XML document.
    ///
    /// Makes exactly one request. A blank payload is an error, never an
    /// empty document.
    ///
    /// # Errors
    ///
    /// Returns `RemoteFetchError::Http` on network failures,
    /// `RemoteFetchError::Fault` if the service answered with a SOAP fault,
    /// `RemoteFetchError::Status` on any other non-success status, and
    /// `RemoteFetchError::EmptyResponse` if the payload is blank.
    #[instrument(skip(self), fields(endpoint = %self.inner.config.endpoint))]
    pub async fn get_stone_data(&self) -> Result<String, RemoteFetchError> {
        let config = &self.inner.config;
        let body = build_request(
            &config.namespace,
            &config.username,
            &config.password,
            &config.api_key,
        );

        let response = self
            .inner
            .client
            .post(config.endpoint.clone())
            .header(
                CONTENT_TYPE,
                HeaderValue::from_static("text/xml; charset=utf-8"),
            )
            .header("SOAPAction", soap_action(&config.namespace))
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        tracing::debug!(status = status.as_u16(), bytes = text.len(), "SOAP response received");

        // ASMX services report faults with a 500, so read the envelope first
        let parsed = parse_response(&text);
        match parsed {
            Ok(SoapResponse::Fault(message)) => Err(RemoteFetchError::Fault(message)),
            Ok(SoapResponse::Result(_)) | Err(_) if !status.is_success() => {
                Err(RemoteFetchError::Status(status.as_u16()))
            }
            Ok(SoapResponse::Result(xml)) => {
                if xml.trim().is_empty() {
                    return Err(RemoteFetchError::EmptyResponse);
                }
                tracing::info!(bytes = xml.len(), "Stock export received");
                Ok(xml)
            }
            Err(e) => Err(e),
        }
    }
}

impl StockSource for SoapClient {
    async fn fetch_stock(&self) -> Result<String, RemoteFetchError> {
        self.get_stone_data().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;
    use url::Url;

    use super::*;
    use crate::config::{DEFAULT_SOAP_ENDPOINT, DEFAULT_SOAP_NAMESPACE};

    #[test]
    fn test_client_creation() {
        let client = SoapClient::new(SoapConfig {
            endpoint: Url::parse(DEFAULT_SOAP_ENDPOINT).unwrap(),
            namespace: DEFAULT_SOAP_NAMESPACE.to_string(),
            username: "gemstones".to_string(),
            password: SecretString::from("pw"),
            api_key: SecretString::from("key"),
            timeout: Duration::from_secs(5),
        })
        .unwrap();

        assert_eq!(client.endpoint(), DEFAULT_SOAP_ENDPOINT);
    }
}
