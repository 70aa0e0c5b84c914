//! HTTP middleware

pub mod instrumentation;

pub use instrumentation::{route_label, track_metrics};
