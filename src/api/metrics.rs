//! Per-request OpenTelemetry instruments.
//!
//! Instruments are created from the global meter, so they are no-ops until a
//! meter provider is installed at startup.

use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
    KeyValue,
};

pub const METER_NAME: &str = "files";

/// Label used for requests that matched no route.
const UNMATCHED_ROUTE: &str = "unmatched";

#[derive(Clone)]
pub struct RequestMetrics {
    /// Total HTTP requests served
    pub requests: Counter<u64>,
    /// Request duration in seconds
    pub duration: Histogram<f64>,
}

impl RequestMetrics {
    pub fn new() -> Self {
        Self::from_meter(&global::meter(METER_NAME))
    }

    pub fn from_meter(meter: &Meter) -> Self {
        Self {
            requests: meter
                .u64_counter("portfolio.files.http.requests")
                .with_description("Total HTTP requests")
                .build(),
            duration: meter
                .f64_histogram("portfolio.files.http.request.duration")
                .with_unit("seconds")
                .with_description("HTTP request duration")
                .build(),
        }
    }

    pub fn record(&self, method: &str, route: &str, status: u16, duration_secs: f64) {
        let labels = &[
            KeyValue::new("method", method.to_string()),
            KeyValue::new("route", route.to_string()),
            KeyValue::new("status", i64::from(status)),
        ];
        self.requests.add(1, labels);
        self.duration.record(duration_secs, labels);
    }
}

impl Default for RequestMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Route template for labels; never the raw path, which carries keys and ids.
fn route_label(req: &Request) -> String {
    req.extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string())
}

pub async fn track_requests(
    State(metrics): State<RequestMetrics>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().to_string();
    let route = route_label(&req);
    let start = Instant::now();

    let response = next.run(req).await;

    metrics.record(
        &method,
        &route,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}
