//! Inventory SOAP service client.
//!
//! Retrieves the full stock snapshot as a single XML document.
//!
//! # Architecture
//!
//! - One `GetStoneData` call per sync run, no retries
//! - SOAP 1.1 envelope built and read with `quick-xml`
//! - The result payload may arrive escaped or as inline markup; both are
//!   returned as the raw stock XML string
//!
//! # Security
//!
//! Credentials are held as `SecretString` and only exposed while writing the
//! request envelope.

pub mod client;
pub mod envelope;

use std::future::Future;

pub use client::SoapClient;

use thiserror::Error;

/// Errors that can occur when fetching the stock export.
#[derive(Debug, Error)]
pub enum RemoteFetchError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status and no SOAP fault.
    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    /// The service answered with a SOAP fault.
    #[error("SOAP fault: {0}")]
    Fault(String),

    /// The result element was present but blank.
    #[error("Stock export was empty")]
    EmptyResponse,

    /// The envelope did not contain a result element.
    #[error("Response did not contain {0}")]
    MissingResult(&'static str),

    /// The envelope itself could not be read.
    #[error("Malformed SOAP envelope: {0}")]
    Envelope(String),
}

/// A source of raw stock XML.
///
/// Implemented by [`SoapClient`]; tests substitute in-memory sources.
pub trait StockSource: Send + Sync {
    /// Fetch the full stock snapshot as an XML document string.
    fn fetch_stock(&self) -> impl Future<Output = Result<String, RemoteFetchError>> + Send;
}
