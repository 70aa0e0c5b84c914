//! Prometheus metrics endpoint
//!
//! Exposes metrics in Prometheus text format for scraping.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};

use crate::error::{AppError, AppResult};
use crate::handlers::AppState;

/// Metrics handler for Prometheus scraping
///
/// Returns every registered instrument, including the process collector, in
/// one text exposition body. Scraping never mutates any instrument.
///
/// # Response
///
/// - `200 OK` with `Content-Type: text/plain; version=0.0.4`
/// - `500 Internal Server Error` if metrics encoding fails
///
/// # Example
///
/// ```bash
/// curl http://localhost:5000/metrics
/// # HELP http_requests_total Total number of HTTP requests
/// # TYPE http_requests_total counter
/// http_requests_total{method="GET",route="/",status_code="200"} 1
/// ```
pub async fn handler(State(state): State<AppState>) -> AppResult<Response> {
    let metrics = state.metrics();
    let body = metrics.gather().map_err(|e| {
        tracing::error!(
            error = %e,
            "Failed to gather metrics for Prometheus scraping"
        );
        AppError::Internal(format!("Failed to gather metrics: {}", e))
    })?;

    Ok(([(header::CONTENT_TYPE, metrics.content_type())], body).into_response())
}
