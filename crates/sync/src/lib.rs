//! Gemstock sync library.
//!
//! Pulls the full stone inventory from the supplier's SOAP stock export,
//! normalizes each record onto the fixed `soap_stones` column schema and
//! replaces the table contents in fixed-size chunks.
//!
//! The [`pipeline::SyncPipeline`] is generic over its two collaborators:
//! a [`soap::StockSource`] that returns the raw XML and a
//! [`loader::StoneStore`] that owns the table. Production wires
//! [`soap::SoapClient`] and [`db::PgStoneStore`]; tests use the in-memory
//! fakes in `test_support`.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod loader;
pub mod mapper;
pub mod pipeline;
pub mod progress;
pub mod routes;
pub mod soap;
pub mod state;
pub mod xml;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

use axum::Router;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::loader::StoneStore;
use crate::soap::StockSource;
use crate::state::AppState;

/// Build the HTTP application with request tracing.
///
/// Sentry layers are added by the binary so tests can drive the router
/// without a Sentry hub.
pub fn app<S, D>(state: AppState<S, D>) -> Router
where
    S: StockSource + 'static,
    D: StoneStore + 'static,
{
    routes::routes()
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}
