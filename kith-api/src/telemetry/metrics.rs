//! Prometheus families and the `/metrics` text endpoint.
//!
//! Route labels arrive normalized, so ids never become label values.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds), 1ms through 10s.
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Process-wide metrics, registered on first use.
pub static METRICS: Lazy<ApiResult<KithMetrics>> = Lazy::new(KithMetrics::new);

#[derive(Clone)]
pub struct KithMetrics {
    /// Labels: method, path, status
    pub http_requests_total: CounterVec,

    /// Labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Error responses by API error code. Labels: code
    pub api_errors_total: CounterVec,
}

impl KithMetrics {
    /// Create and register all metrics with the default registry.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "kith_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| {
                ApiError::internal_error(format!("Failed to register http_requests_total: {}", e))
            })?,

            http_request_duration_seconds: register_histogram_vec!(
                "kith_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| {
                ApiError::internal_error(format!(
                    "Failed to register http_request_duration_seconds: {}",
                    e
                ))
            })?,

            api_errors_total: register_counter_vec!(
                "kith_api_errors_total",
                "Error responses by API error code",
                &["code"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register api_errors_total: {}", e)))?,
        })
    }

    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    pub fn record_api_error(&self, code: &str) {
        self.api_errors_total.with_label_values(&[code]).inc();
    }
}

/// GET /metrics - Prometheus text format.
pub async fn metrics_handler() -> impl IntoResponse {
    // Make sure the HTTP families exist even before the first request.
    if let Err(e) = METRICS.as_ref() {
        tracing::warn!(error = %e, "Metrics registry unavailable");
    }

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_http_request() -> Result<(), String> {
        let metrics = METRICS
            .as_ref()
            .map_err(|e| format!("Metrics init failed: {}", e.message))?;
        metrics.record_http_request("GET", "/api/friends/{id}", 200, 0.015);

        let count = metrics
            .http_requests_total
            .with_label_values(&["GET", "/api/friends/{id}", "200"])
            .get();
        assert!(count >= 1.0);
        Ok(())
    }

    #[test]
    fn test_record_api_error() -> Result<(), String> {
        let metrics = METRICS
            .as_ref()
            .map_err(|e| format!("Metrics init failed: {}", e.message))?;
        let before = metrics.api_errors_total.with_label_values(&["CONFLICT"]).get();
        metrics.record_api_error("CONFLICT");
        let after = metrics.api_errors_total.with_label_values(&["CONFLICT"]).get();
        assert!(after >= before + 1.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_metrics_handler_lists_http_families() {
        if let Ok(metrics) = METRICS.as_ref() {
            metrics.record_http_request("GET", "/health/ping", 200, 0.001);
        }
        let response = metrics_handler().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("kith_http_requests_total"));
    }
}
