use axum::http::StatusCode;
use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec, register_int_gauge, Encoder, IntCounterVec, IntGauge, TextEncoder};

// Prometheus metrics (default registry)
pub static STORE_OPERATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "kvstore_operations_total",
        "Operations processed by store workers",
        &["store", "op"]
    )
    .expect("register operations_total")
});

pub static SNAPSHOT_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "kvstore_snapshot_failures_total",
        "Failed save/load operations",
        &["store", "op"]
    )
    .expect("register snapshot_failures_total")
});

pub static LIVE_STORES: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("kvstore_live_stores", "Store instances currently running")
        .expect("register live_stores")
});

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
    (
        StatusCode::OK,
        String::from_utf8(buffer).unwrap_or_default(),
    )
}
