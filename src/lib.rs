//! promdemo - Minimal HTTP server exposing Prometheus request metrics
//!
//! Serves a greeting route, a mocked login/logout session gauge, a static
//! public directory and a `/metrics` endpoint. Every response is recorded by
//! the instrumentation middleware into an explicit [`metrics::Metrics`]
//! registry that is injected through the application state.

pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod sampler;
pub mod server;
pub mod telemetry;
