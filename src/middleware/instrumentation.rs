//! Request instrumentation middleware
//!
//! Times every request and hands a [`RequestOutcome`] to
//! [`Metrics::record_response`] once the response body has been fully
//! streamed, or dropped before that.
//!
//! Installed with `Router::layer`, so it runs after routing and can see the
//! [`MatchedPath`] of the route that handled the request.

use axum::{
    body::{Body, Bytes},
    extract::{MatchedPath, Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::Response,
};
use http_body::{Body as HttpBody, Frame, SizeHint};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use crate::handlers::AppState;
use crate::metrics::{Metrics, RequestOutcome};

/// Resolve the `route` label for a request
///
/// Uses the matched route pattern when a route handled the request, otherwise
/// the literal request path (404s and static files).
pub fn route_label(matched: Option<&MatchedPath>, path: &str) -> String {
    match matched {
        Some(matched) => matched.as_str().to_owned(),
        None => path.to_owned(),
    }
}

/// Middleware that records request count, error count and latency
///
/// Error responses produced further down the stack (including a panicking
/// handler turned into a 500 by `CatchPanicLayer`) pass through here and are
/// recorded like any other response.
pub async fn track_metrics(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let route = route_label(
        request.extensions().get::<MatchedPath>(),
        request.uri().path(),
    );

    let response = next.run(request).await;

    let completion = Completion {
        metrics: state.metrics().clone(),
        method,
        route,
        status: response.status(),
        start,
    };

    response.map(|inner| {
        Body::new(InstrumentedBody {
            inner,
            completion: Some(completion),
        })
    })
}

/// Everything needed to record a request once its body is done
struct Completion {
    metrics: Metrics,
    method: Method,
    route: String,
    status: StatusCode,
    start: Instant,
}

impl Completion {
    fn finish(self) {
        let outcome = RequestOutcome {
            method: self.method,
            route: self.route,
            status: self.status,
            elapsed: self.start.elapsed(),
        };

        tracing::debug!(
            method = %outcome.method,
            route = %outcome.route,
            status_code = outcome.status.as_u16(),
            elapsed_seconds = outcome.elapsed.as_secs_f64(),
            "Request completed"
        );

        self.metrics.record_response(&outcome);
    }
}

/// Response body that records its request when the stream ends
///
/// The end is the last frame, a body error, or the body being dropped,
/// whichever happens first. `completion` is taken on the first of these so
/// the request is recorded once.
struct InstrumentedBody {
    inner: Body,
    completion: Option<Completion>,
}

impl InstrumentedBody {
    fn complete(&mut self) {
        if let Some(completion) = self.completion.take() {
            completion.finish();
        }
    }
}

impl HttpBody for InstrumentedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);

        match &polled {
            Poll::Ready(None) | Poll::Ready(Some(Err(_))) => this.complete(),
            Poll::Ready(Some(Ok(_))) if this.inner.is_end_stream() => this.complete(),
            _ => {}
        }

        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for InstrumentedBody {
    fn drop(&mut self) {
        self.complete();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::{Router, http::Request as HttpRequest, middleware, routing::get};
    use std::convert::Infallible;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    const SLOW_CHUNK_DELAY: Duration = Duration::from_millis(300);

    async fn slow_body() -> Body {
        Body::from_stream(futures::stream::once(async {
            tokio::time::sleep(SLOW_CHUNK_DELAY).await;
            Ok::<_, Infallible>(Bytes::from_static(b"done"))
        }))
    }

    fn create_test_app() -> (Router, Metrics) {
        let metrics = Metrics::new().expect("should create metrics");
        let state = AppState::new(Arc::new(Config::default()), metrics.clone());

        let app = Router::new()
            .route("/items/{id}", get(|| async { "item" }))
            .route("/teapot", get(|| async { StatusCode::IM_A_TEAPOT }))
            .route("/slow", get(slow_body))
            .layer(middleware::from_fn_with_state(state.clone(), track_metrics))
            .with_state(state);

        (app, metrics)
    }

    async fn call(app: Router, uri: &str) -> Response {
        app.oneshot(HttpRequest::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn send(app: Router, uri: &str) -> StatusCode {
        call(app, uri).await.status()
    }

    #[test]
    fn test_route_label_falls_back_to_path() {
        assert_eq!(route_label(None, "/nonexistent"), "/nonexistent");
    }

    #[tokio::test]
    async fn test_parameterized_route_uses_pattern_label() {
        let (app, metrics) = create_test_app();

        assert_eq!(send(app.clone(), "/items/1").await, StatusCode::OK);
        assert_eq!(send(app, "/items/2").await, StatusCode::OK);

        assert_eq!(metrics.requests_count("GET", "/items/{id}", 200), 2);
        assert_eq!(metrics.requests_count("GET", "/items/1", 200), 0);
    }

    #[tokio::test]
    async fn test_unmatched_path_uses_literal_path_label() {
        let (app, metrics) = create_test_app();

        assert_eq!(send(app, "/nope?x=1").await, StatusCode::NOT_FOUND);

        assert_eq!(metrics.requests_count("GET", "/nope", 404), 1);
        assert_eq!(metrics.errors_count("/nope", 404), 1);
    }

    #[tokio::test]
    async fn test_handler_error_status_counts_as_error() {
        let (app, metrics) = create_test_app();

        assert_eq!(send(app, "/teapot").await, StatusCode::IM_A_TEAPOT);

        assert_eq!(metrics.requests_count("GET", "/teapot", 418), 1);
        assert_eq!(metrics.errors_count("/teapot", 418), 1);
        assert_eq!(metrics.latency_sample_count("GET", "/teapot", 418), 1);
    }

    #[tokio::test]
    async fn test_streaming_body_is_recorded_after_last_chunk() {
        let (app, metrics) = create_test_app();

        let response = call(app, "/slow").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(metrics.requests_count("GET", "/slow", 200), 0);
        assert_eq!(metrics.latency_sample_count("GET", "/slow", 200), 0);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"done");

        assert_eq!(metrics.requests_count("GET", "/slow", 200), 1);
        assert_eq!(metrics.latency_sample_count("GET", "/slow", 200), 1);
        assert!(
            metrics.latency_sample_sum("GET", "/slow", 200) >= SLOW_CHUNK_DELAY.as_secs_f64(),
            "latency should cover streaming the body"
        );
    }

    #[tokio::test]
    async fn test_body_dropped_mid_stream_is_recorded_once() {
        let (app, metrics) = create_test_app();

        let response = call(app, "/slow").await;
        drop(response);

        assert_eq!(metrics.requests_count("GET", "/slow", 200), 1);
        assert_eq!(metrics.latency_sample_count("GET", "/slow", 200), 1);
    }
}
