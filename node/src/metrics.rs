//! # Prometheus Metrics
//!
//! Ticketing counters and request latency, scraped from `/metrics` on the
//! metrics port. Everything lives in a dedicated registry under the
//! `lumentix` namespace.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Metric handles for the node. Handles are internally reference-counted.
#[derive(Clone)]
pub struct TicketMetrics {
    registry: Registry,
    /// Tickets minted.
    pub tickets_issued_total: IntCounter,
    /// Issuance calls answered with an already-existing ticket.
    pub issuance_replays_total: IntCounter,
    /// Failed issuance calls, by error kind.
    pub issuance_rejected_total: IntCounterVec,
    /// Completed ownership transfers.
    pub transfers_total: IntCounter,
    /// Failed transfers, by error kind.
    pub transfers_rejected_total: IntCounterVec,
    /// Handler latency in seconds, by route.
    pub request_latency_seconds: HistogramVec,
}

impl TicketMetrics {
    /// Creates and registers all metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("lumentix".into()), None)?;

        let tickets_issued_total =
            IntCounter::new("tickets_issued_total", "Total number of tickets minted")?;
        registry.register(Box::new(tickets_issued_total.clone()))?;

        let issuance_replays_total = IntCounter::new(
            "issuance_replays_total",
            "Issuance requests answered with an existing ticket",
        )?;
        registry.register(Box::new(issuance_replays_total.clone()))?;

        let issuance_rejected_total = IntCounterVec::new(
            Opts::new("issuance_rejected_total", "Failed issuance requests"),
            &["kind"],
        )?;
        registry.register(Box::new(issuance_rejected_total.clone()))?;

        let transfers_total =
            IntCounter::new("transfers_total", "Total number of completed ticket transfers")?;
        registry.register(Box::new(transfers_total.clone()))?;

        let transfers_rejected_total = IntCounterVec::new(
            Opts::new("transfers_rejected_total", "Failed transfer requests"),
            &["kind"],
        )?;
        registry.register(Box::new(transfers_rejected_total.clone()))?;

        let request_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "request_latency_seconds",
                "Ticket API handler latency in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["route"],
        )?;
        registry.register(Box::new(request_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            tickets_issued_total,
            issuance_replays_total,
            issuance_rejected_total,
            transfers_total,
            transfers_rejected_total,
            request_latency_seconds,
        })
    }

    /// Encodes all registered metrics in the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

pub type SharedMetrics = Arc<TicketMetrics>;

/// Renders `/metrics`.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_exposition() {
        let metrics = TicketMetrics::new().unwrap();
        metrics.tickets_issued_total.inc();
        metrics
            .issuance_rejected_total
            .with_label_values(&["invalid_request"])
            .inc();

        let text = metrics.encode().unwrap();
        assert!(text.contains("lumentix_tickets_issued_total 1"));
        assert!(text.contains("lumentix_issuance_rejected_total{kind=\"invalid_request\"} 1"));
    }

    #[test]
    fn registries_are_independent() {
        let a = TicketMetrics::new().unwrap();
        let b = TicketMetrics::new().unwrap();
        a.transfers_total.inc();
        assert_eq!(b.transfers_total.get(), 0);
    }
}
