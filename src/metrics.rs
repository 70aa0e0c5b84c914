//! Prometheus metrics collection for promdemo
//!
//! This module provides metrics instrumentation for tracking:
//! - Completed HTTP requests by method, route and status code
//! - Request latency in seconds
//! - Error responses (status code >= 400) by route and status code
//! - The mocked active-users and disk-usage gauges
//!
//! Metrics are exposed via the `/metrics` endpoint in Prometheus text format,
//! together with the default process metrics on Linux.

use axum::http::{Method, StatusCode};
use prometheus::{
    Encoder, Gauge, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

/// Latency histogram bucket boundaries, in seconds
pub const LATENCY_BUCKETS: [f64; 5] = [0.1, 0.5, 1.0, 2.0, 5.0];

/// Outcome of one completed request, handed to [`Metrics::record_response`]
#[derive(Debug, Clone)]
pub struct RequestOutcome {
    pub method: Method,
    /// Route label: the matched route pattern, or the literal path when nothing matched
    pub route: String,
    pub status: StatusCode,
    pub elapsed: Duration,
}

impl RequestOutcome {
    /// Numeric status code as used in the `status_code` label
    pub fn status_label(&self) -> String {
        self.status.as_u16().to_string()
    }
}

/// Metrics collector for promdemo
///
/// Owns its own registry rather than the process-global default one, so every
/// server (and every test) gets an isolated set of instruments.
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    requests_total: IntCounterVec,
    request_duration: HistogramVec,
    errors_total: IntCounterVec,
    active_users: IntGauge,
    disk_space_used: Gauge,
}

impl Metrics {
    /// Create a new Metrics instance
    ///
    /// Registers all metrics with a new Prometheus registry, plus the process
    /// collector where the platform supports it.
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Cardinality: methods × routes × status codes. Unmatched paths are
        // labelled with the literal path, so every distinct 404 path adds series.
        let requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "route", "status_code"],
        )?;

        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "Request latency in seconds",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
            &["method", "route", "status_code"],
        )?;

        let errors_total = IntCounterVec::new(
            Opts::new("http_errors_total", "Total number of HTTP errors"),
            &["route", "status_code"],
        )?;

        let active_users = IntGauge::with_opts(Opts::new(
            "active_users",
            "Current number of active users",
        ))?;

        let disk_space_used = Gauge::with_opts(Opts::new(
            "disk_space_used_bytes",
            "Mocked disk usage in bytes (using memory usage)",
        ))?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(errors_total.clone()))?;
        registry.register(Box::new(active_users.clone()))?;
        registry.register(Box::new(disk_space_used.clone()))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self {
            registry: Arc::new(registry),
            requests_total,
            request_duration,
            errors_total,
            active_users,
            disk_space_used,
        })
    }

    /// Record a completed request
    ///
    /// Increments `http_requests_total`, increments `http_errors_total` when the
    /// status is >= 400, then observes the elapsed seconds into
    /// `http_request_duration_seconds`.
    ///
    /// Never fails: a label lookup error is logged and that single update is
    /// dropped, leaving the response already in flight untouched.
    pub fn record_response(&self, outcome: &RequestOutcome) {
        let method = outcome.method.as_str();
        let route = outcome.route.as_str();
        let status = outcome.status_label();

        match self
            .requests_total
            .get_metric_with_label_values(&[method, route, status.as_str()])
        {
            Ok(counter) => counter.inc(),
            Err(e) => tracing::warn!(
                error = %e,
                method,
                route,
                status_code = %status,
                "Failed to record http_requests_total"
            ),
        }

        if outcome.status.as_u16() >= 400 {
            match self
                .errors_total
                .get_metric_with_label_values(&[route, status.as_str()])
            {
                Ok(counter) => counter.inc(),
                Err(e) => tracing::warn!(
                    error = %e,
                    route,
                    status_code = %status,
                    "Failed to record http_errors_total"
                ),
            }
        }

        match self
            .request_duration
            .get_metric_with_label_values(&[method, route, status.as_str()])
        {
            Ok(histogram) => histogram.observe(outcome.elapsed.as_secs_f64()),
            Err(e) => tracing::warn!(
                error = %e,
                method,
                route,
                status_code = %status,
                "Failed to record http_request_duration_seconds"
            ),
        }
    }

    /// Mock login: one more active user
    pub fn user_logged_in(&self) {
        self.active_users.inc();
    }

    /// Mock logout: one less active user
    ///
    /// No floor is enforced, the gauge goes negative on unmatched logouts.
    pub fn user_logged_out(&self) {
        self.active_users.dec();
    }

    /// Overwrite the mocked disk-usage gauge with the latest sample
    pub fn set_disk_space_used(&self, bytes: u64) {
        self.disk_space_used.set(bytes as f64);
    }

    /// Current value of `http_requests_total` for one label combination
    ///
    /// Looking up a combination that was never recorded creates it at zero.
    pub fn requests_count(&self, method: &str, route: &str, status_code: u16) -> u64 {
        let status = status_code.to_string();
        self.requests_total
            .get_metric_with_label_values(&[method, route, status.as_str()])
            .map(|c| c.get())
            .unwrap_or(0)
    }

    /// Current value of `http_errors_total` for one label combination
    pub fn errors_count(&self, route: &str, status_code: u16) -> u64 {
        let status = status_code.to_string();
        self.errors_total
            .get_metric_with_label_values(&[route, status.as_str()])
            .map(|c| c.get())
            .unwrap_or(0)
    }

    /// Number of latency observations for one label combination
    pub fn latency_sample_count(&self, method: &str, route: &str, status_code: u16) -> u64 {
        let status = status_code.to_string();
        self.request_duration
            .get_metric_with_label_values(&[method, route, status.as_str()])
            .map(|h| h.get_sample_count())
            .unwrap_or(0)
    }

    /// Sum of latency observations, in seconds, for one label combination
    pub fn latency_sample_sum(&self, method: &str, route: &str, status_code: u16) -> f64 {
        let status = status_code.to_string();
        self.request_duration
            .get_metric_with_label_values(&[method, route, status.as_str()])
            .map(|h| h.get_sample_sum())
            .unwrap_or(0.0)
    }

    pub fn active_users(&self) -> i64 {
        self.active_users.get()
    }

    pub fn disk_space_used(&self) -> f64 {
        self.disk_space_used.get()
    }

    /// Content type declared by the text exposition format
    pub fn content_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }

    /// Gather all metrics and encode them in Prometheus text format
    ///
    /// Reading is side-effect free: two calls with no recording in between
    /// return the same counter and gauge values.
    ///
    /// # Errors
    ///
    /// Returns an error if metric encoding fails.
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();

        tracing::debug!(
            metric_family_count = metric_families.len(),
            "Encoding metrics to Prometheus text format"
        );

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&metric_families, &mut buffer)?;

        String::from_utf8(buffer).map_err(|e| {
            prometheus::Error::Msg(format!(
                "Failed to convert metrics to UTF-8 at byte {}: {}",
                e.utf8_error().valid_up_to(),
                e
            ))
        })
    }
}
