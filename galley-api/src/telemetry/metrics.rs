//! Prometheus Metrics Definitions
//!
//! HTTP request metrics plus the cache coordinator counters, exposed on
//! `/metrics` for Prometheus scraping.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use galley_storage::{CachedRecipeStore, CoordinatorStats};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, register_int_gauge_vec,
    CounterVec, Encoder, Gauge, HistogramVec, IntGaugeVec, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance - initialized once at startup
pub static METRICS: Lazy<ApiResult<GalleyMetrics>> = Lazy::new(GalleyMetrics::new);

/// Container for all Galley metrics.
#[derive(Clone)]
pub struct GalleyMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Cumulative coordinator events - labels: outcome
    pub cache_events: IntGaugeVec,

    /// Listing hit rate since process start (0.0 to 1.0)
    pub cache_hit_rate: Gauge,
}

fn register_failed(name: &str, err: prometheus::Error) -> ApiError {
    ApiError::internal_error(format!("Failed to register {}: {}", name, err))
}

impl GalleyMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "galley_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| register_failed("http_requests_total", e))?,

            http_request_duration_seconds: register_histogram_vec!(
                "galley_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| register_failed("http_request_duration_seconds", e))?,

            cache_events: register_int_gauge_vec!(
                "galley_cache_events",
                "Cumulative recipe cache events by outcome",
                &["outcome"]
            )
            .map_err(|e| register_failed("cache_events", e))?,

            cache_hit_rate: register_gauge!(
                "galley_cache_hit_rate",
                "Fraction of recipe listings answered from the cache"
            )
            .map_err(|e| register_failed("cache_hit_rate", e))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Mirror the coordinator counters into the gauges.
    pub fn record_cache_stats(&self, stats: &CoordinatorStats) {
        let outcomes = [
            ("hit", stats.hits),
            ("miss", stats.misses),
            ("error", stats.cache_errors),
            ("refill_failure", stats.refill_failures),
            ("invalidation", stats.invalidations),
            ("invalidation_failure", stats.invalidation_failures),
        ];
        for (outcome, value) in outcomes {
            self.cache_events
                .with_label_values(&[outcome])
                .set(i64::try_from(value).unwrap_or(i64::MAX));
        }
        self.cache_hit_rate.set(stats.hit_rate());
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/metrics",
    tag = "Observability",
    responses(
        (status = 200, description = "Prometheus metrics in text format", content_type = "text/plain"),
        (status = 500, description = "Failed to encode metrics"),
    ),
))]
pub async fn metrics_handler(State(recipes): State<CachedRecipeStore>) -> impl IntoResponse {
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_cache_stats(&recipes.stats());
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
