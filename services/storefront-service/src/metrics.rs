// =============================================================================
// METRICS MODULE
// =============================================================================
// Prometheus metrics for the storefront service, scraped from /metrics.
//
// Besides HTTP traffic we track every record-store operation labelled with
// the backend that served it, so a failover to the file store is visible
// on a dashboard.
// =============================================================================

use std::time::{Duration, Instant};

use anyhow::Result;
use axum::{
    body::Body,
    extract::MatchedPath,
    http::Request,
    middleware::Next,
    response::Response,
};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

use crate::store::Backend;

// =============================================================================
// METRIC NAMES
// =============================================================================

/// Labels: method, endpoint, status
pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";

/// Labels: method, endpoint
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";

/// Labels: backend (file/database), collection, operation
pub const STORE_OPERATION_DURATION_SECONDS: &str = "store_operation_duration_seconds";

/// Labels: backend, collection, operation
pub const STORE_ERRORS_TOTAL: &str = "store_errors_total";

/// 1 while record operations are served by PostgreSQL, 0 on the file store
pub const STORAGE_BACKEND_CONNECTED: &str = "storage_backend_connected";

/// Products currently below the low-stock threshold
pub const INVENTORY_LOW_STOCK_ITEMS: &str = "inventory_low_stock_items";

/// Labels: source (checkout/admin)
pub const ORDERS_CREATED_TOTAL: &str = "orders_created_total";

// =============================================================================
// SETUP FUNCTION
// =============================================================================
/// Install the global Prometheus recorder and return the render handle.
pub fn setup_metrics() -> Result<PrometheusHandle> {
    let latency_buckets = &[
        0.001, // 1ms
        0.005, // 5ms
        0.01,  // 10ms
        0.025, // 25ms
        0.05,  // 50ms
        0.1,   // 100ms
        0.25,  // 250ms
        0.5,   // 500ms
        1.0,   // 1 second
        2.5,   // 2.5 seconds
        5.0,   // 5 seconds
        10.0,  // 10 seconds
    ];

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(HTTP_REQUEST_DURATION_SECONDS.to_string()),
            latency_buckets,
        )?
        .set_buckets_for_metric(
            Matcher::Full(STORE_OPERATION_DURATION_SECONDS.to_string()),
            latency_buckets,
        )?
        .install_recorder()?;

    describe_counter!(HTTP_REQUESTS_TOTAL, "Total number of HTTP requests received");
    describe_histogram!(HTTP_REQUEST_DURATION_SECONDS, "HTTP request latency in seconds");
    describe_histogram!(
        STORE_OPERATION_DURATION_SECONDS,
        "Record store operation latency in seconds"
    );
    describe_counter!(STORE_ERRORS_TOTAL, "Record store write failures");
    describe_gauge!(
        STORAGE_BACKEND_CONNECTED,
        "Whether record operations are routed to PostgreSQL (1) or the file store (0)"
    );
    describe_gauge!(
        INVENTORY_LOW_STOCK_ITEMS,
        "Number of products currently below the low stock threshold"
    );
    describe_counter!(ORDERS_CREATED_TOTAL, "Total number of orders created");

    Ok(handle)
}

// =============================================================================
// HTTP MIDDLEWARE
// =============================================================================
/// Record count and latency for every routed request.
///
/// Installed with `route_layer` so the matched route template (not the raw
/// path) is used as the endpoint label.
pub async fn track_http(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let response = next.run(request).await;

    record_http_request(
        &method,
        &endpoint,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

pub fn record_http_request(method: &str, endpoint: &str, status: u16, duration_secs: f64) {
    counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string()
    )
    .record(duration_secs);
}

pub fn record_store_operation(
    backend: Backend,
    collection: &'static str,
    operation: &'static str,
    elapsed: Duration,
) {
    histogram!(
        STORE_OPERATION_DURATION_SECONDS,
        "backend" => backend.as_str(),
        "collection" => collection,
        "operation" => operation
    )
    .record(elapsed.as_secs_f64());
}

pub fn record_store_error(backend: Backend, collection: &'static str, operation: &'static str) {
    counter!(
        STORE_ERRORS_TOTAL,
        "backend" => backend.as_str(),
        "collection" => collection,
        "operation" => operation
    )
    .increment(1);
}

pub fn set_backend_connected(connected: bool) {
    gauge!(STORAGE_BACKEND_CONNECTED).set(if connected { 1.0 } else { 0.0 });
}

pub fn set_low_stock_count(count: usize) {
    gauge!(INVENTORY_LOW_STOCK_ITEMS).set(count as f64);
}

pub fn record_order_created(source: &'static str) {
    counter!(ORDERS_CREATED_TOTAL, "source" => source).increment(1);
}
