use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Gauge, Histogram, register_counter, register_counter_vec,
    register_gauge, register_histogram,
};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("chat_requests_total", "Total number of chat requests").unwrap();
    pub static ref ADMITTED_TOTAL: Counter =
        register_counter!("chat_admitted_total", "Chat requests admitted by the rate limiter")
            .unwrap();
    pub static ref REJECTED_TOTAL: CounterVec = register_counter_vec!(
        "chat_rejected_total",
        "Chat requests rejected by the rate limiter",
        &["window"]
    )
    .unwrap();
    pub static ref UPSTREAM_ERRORS: Counter =
        register_counter!("chat_upstream_errors_total", "Failed upstream calls").unwrap();
    pub static ref UPSTREAM_LATENCY: Histogram = register_histogram!(
        "chat_upstream_latency_seconds",
        "Time until the upstream response headers arrive"
    )
    .unwrap();
    pub static ref TRACKED_CLIENTS: Gauge =
        register_gauge!("chat_tracked_clients", "Clients with request history in memory").unwrap();
}
