use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec, TextEncoder};

// Prometheus metrics (default registry)
pub static REGISTRATIONS_INITIATED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "reseller_registrations_initiated_total",
        "Registration payments created at the gateway"
    )
    .expect("register registrations_initiated_total")
});

pub static REGISTRATIONS_COMPLETED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "reseller_registrations_completed_total",
        "Reseller accounts created from confirmed payments"
    )
    .expect("register registrations_completed_total")
});

pub static REGISTRATION_REPLAYS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "reseller_registration_replays_total",
        "Success confirmations for payments that were already completed"
    )
    .expect("register registration_replays_total")
});

pub static SUBDOMAIN_CONFLICTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "reseller_subdomain_conflicts_total",
        "Subdomain candidates rejected by the unique index at commit"
    )
    .expect("register subdomain_conflicts_total")
});

pub static NOTIFICATION_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "reseller_notification_failures_total",
        "Notifications that could not be handed to the sink"
    )
    .expect("register notification_failures_total")
});

pub static GATEWAY_OUTCOMES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "payment_gateway_outcomes_total",
        "Gateway outcome callbacks by reported outcome",
        &["outcome"]
    )
    .expect("register gateway_outcomes_total")
});

pub fn encode_metrics() -> (axum::http::StatusCode, String) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encode error: {e}"),
        );
    }
    (
        axum::http::StatusCode::OK,
        String::from_utf8(buffer).unwrap_or_default(),
    )
}
