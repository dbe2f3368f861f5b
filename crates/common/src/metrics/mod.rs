//! Metrics and observability utilities
//!
//! Emits metrics through the `metrics` facade with standardized naming.
//! Without an installed recorder every call is a no-op, so libraries and
//! tests can record freely.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

/// Metrics prefix for all ContextForge metrics
pub const METRICS_PREFIX: &str = "contextforge";

/// Register all metric descriptions
pub fn register_metrics() {
    // Ranking metrics
    describe_counter!(
        format!("{}_rank_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of ranking requests"
    );

    describe_histogram!(
        format!("{}_rank_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Ranking request latency in seconds"
    );

    describe_counter!(
        format!("{}_chunks_scored_total", METRICS_PREFIX),
        Unit::Count,
        "Total chunks scored against a query"
    );

    describe_counter!(
        format!("{}_records_skipped_total", METRICS_PREFIX),
        Unit::Count,
        "Malformed records skipped during processing"
    );

    // Thread metrics
    describe_counter!(
        format!("{}_threads_built_total", METRICS_PREFIX),
        Unit::Count,
        "Total comment threads reconstructed"
    );

    describe_counter!(
        format!("{}_comments_orphaned_total", METRICS_PREFIX),
        Unit::Count,
        "Comments re-attached to the root because of dangling or cyclic parents"
    );

    // Similarity metrics
    describe_counter!(
        format!("{}_similarity_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total similarity provider requests"
    );

    describe_histogram!(
        format!("{}_similarity_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Similarity provider latency in seconds"
    );

    describe_counter!(
        format!("{}_similarity_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Total similarity provider errors"
    );

    tracing::debug!("Metrics registered");
}

/// Helper to record ranking metrics
pub fn record_ranking(duration_secs: f64, documents: usize, chunks: usize, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_rank_requests_total", METRICS_PREFIX),
        "status" => status
    )
    .increment(1);

    histogram!(format!("{}_rank_duration_seconds", METRICS_PREFIX)).record(duration_secs);

    counter!(format!("{}_chunks_scored_total", METRICS_PREFIX)).increment(chunks as u64);

    tracing::trace!(documents, chunks, duration_secs, "Ranking metrics recorded");
}

/// Helper to record skipped malformed records
pub fn record_skipped(kind: &str, count: usize) {
    if count == 0 {
        return;
    }
    counter!(
        format!("{}_records_skipped_total", METRICS_PREFIX),
        "kind" => kind.to_string()
    )
    .increment(count as u64);
}

/// Helper to record thread reconstruction metrics
pub fn record_thread(orphaned: usize) {
    counter!(format!("{}_threads_built_total", METRICS_PREFIX)).increment(1);
    counter!(format!("{}_comments_orphaned_total", METRICS_PREFIX)).increment(orphaned as u64);
}

/// Helper to record similarity provider metrics
pub fn record_similarity(duration_secs: f64, model: &str, batch_size: usize, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_similarity_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_similarity_duration_seconds", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .record(duration_secs);
    } else {
        counter!(
            format!("{}_similarity_errors_total", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .increment(1);
    }

    tracing::trace!(model, batch_size, success, "Similarity metrics recorded");
}
