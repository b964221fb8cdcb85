//! Metrics and observability utilities
//!
//! Counter definitions for the ingestion and query pipelines, using the
//! metrics-rs facade. Exporter wiring belongs to the embedding binary,
//! not this library.

use metrics::{describe_counter, Unit};

/// Metrics prefix for all DocuChat metrics
pub const METRICS_PREFIX: &str = "docuchat";

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_ingestions_total", METRICS_PREFIX),
        Unit::Count,
        "Documents ingested successfully"
    );

    describe_counter!(
        format!("{}_ingestion_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Ingestion attempts that failed, labeled by failure class"
    );

    describe_counter!(
        format!("{}_chunks_indexed_total", METRICS_PREFIX),
        Unit::Count,
        "Chunks embedded and upserted into the vector index"
    );

    describe_counter!(
        format!("{}_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Questions answered successfully"
    );

    describe_counter!(
        format!("{}_query_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Queries that failed, labeled by pipeline stage"
    );
}
