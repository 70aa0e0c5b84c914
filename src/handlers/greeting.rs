//! Greeting endpoint

/// Body returned by `GET /`
pub const GREETING: &str = "Hello World!";

/// Greeting handler
///
/// Stateless. The only metrics it produces come from the instrumentation
/// middleware.
pub async fn handler() -> &'static str {
    GREETING
}
