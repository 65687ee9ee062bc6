use axum::http::StatusCode;
use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec, TextEncoder,
};

// Prometheus metrics (default registry)
pub static RECORDS_WRITTEN_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "record_store_records_written_total",
        "Total user records written"
    )
    .expect("register records_written_total")
});

pub static RECORD_LOOKUPS_MISSED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "record_store_lookups_missed_total",
        "Total record lookups for ids with no file"
    )
    .expect("register lookups_missed_total")
});

pub static UPSTREAM_CALLS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "cloud_proxy_upstream_calls_total",
        "Total cloud API calls by operation",
        &["operation"]
    )
    .expect("register upstream_calls_total")
});

pub static UPSTREAM_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "cloud_proxy_upstream_errors_total",
        "Total failed cloud API calls by operation",
        &["operation"]
    )
    .expect("register upstream_errors_total")
});

/// Record one upstream call and whether it failed.
pub fn observe_upstream(operation: &str, ok: bool) {
    UPSTREAM_CALLS_TOTAL.with_label_values(&[operation]).inc();
    if !ok {
        UPSTREAM_ERRORS_TOTAL.with_label_values(&[operation]).inc();
    }
}

pub fn encode_metrics() -> (StatusCode, String) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encode error: {e}"),
        );
    }
    (StatusCode::OK, String::from_utf8(buffer).unwrap_or_default())
}
