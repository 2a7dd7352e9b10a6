//! Prometheus metrics definitions.

use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, Encoder, IntCounter,
    IntCounterVec, IntGauge, TextEncoder,
};

use crate::error::{Error, Result};

/// Completed scan passes.
pub static SCAN_PASSES: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("postcode_marker_scan_passes_total", "Completed scan passes").unwrap()
});

/// Candidates collected by the most recent pass.
pub static CANDIDATES_LAST_PASS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "postcode_marker_candidates_last_pass",
        "Text units collected by the most recent scan pass"
    )
    .unwrap()
});

/// Wrappers inserted into documents.
pub static WRAPPERS_CREATED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "postcode_marker_wrappers_created_total",
        "Postal code wrappers inserted"
    )
    .unwrap()
});

/// Per-unit failures inside scan passes.
pub static UNIT_ERRORS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "postcode_marker_unit_errors_total",
        "Text units whose rewrite failed"
    )
    .unwrap()
});

/// Mutation batches ignored as self-caused.
pub static MUTATIONS_SUPPRESSED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "postcode_marker_mutation_batches_suppressed_total",
        "Mutation batches ignored because the engine caused them"
    )
    .unwrap()
});

/// Rescans requested by the mutation watcher.
pub static RESCANS_REQUESTED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "postcode_marker_rescans_requested_total",
        "Rescans requested after foreign document changes"
    )
    .unwrap()
});

/// Copy attempts by outcome.
pub static COPY_RESULTS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "postcode_marker_copy_results_total",
        "Clipboard copy attempts",
        &["outcome"]
    )
    .unwrap()
});

/// Initialize all metrics (call once at startup).
pub fn init_metrics() {
    let _ = &*SCAN_PASSES;
    let _ = &*CANDIDATES_LAST_PASS;
    let _ = &*WRAPPERS_CREATED;
    let _ = &*UNIT_ERRORS;
    let _ = &*MUTATIONS_SUPPRESSED;
    let _ = &*RESCANS_REQUESTED;
    let _ = &*COPY_RESULTS;

    tracing::debug!("Prometheus metrics initialized");
}

/// Render every registered metric in the text exposition format.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn render_metrics() -> Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| Error::internal(format!("failed to encode metrics: {e}")))?;
    String::from_utf8(buffer).map_err(|e| Error::internal(format!("metrics are not UTF-8: {e}")))
}
