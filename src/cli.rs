//! Command-line interface for promdemo
//!
//! Provides argument parsing and subcommand handling for the promdemo binary.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Minimal HTTP server exposing Prometheus request metrics
#[derive(Parser)]
#[command(name = "promdemo")]
#[command(version)]
#[command(about = "Minimal HTTP server exposing Prometheus request metrics")]
#[command(
    long_about = "promdemo serves a greeting route, mocked login/logout routes and a static \
    directory, and records every response into Prometheus metrics exposed at /metrics. \
    The PORT environment variable overrides the configured port."
)]
pub struct Cli {
    /// Path to an optional TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# promdemo Configuration
# ======================
#
# Every setting is optional. Without a file the server listens on 0.0.0.0:5000
# and serves ./public.

[server]
# IP address to bind to (0.0.0.0 for all interfaces, 127.0.0.1 for localhost only)
host = "0.0.0.0"

# Port to listen on. The PORT environment variable takes precedence.
port = 5000

# Directory served for paths that no route handles
public_dir = "public"

[sampler]
# Seconds between disk_space_used_bytes samples
interval_seconds = 5

[observability]
# Log level: "trace", "debug", "info", "warn", "error" (RUST_LOG takes precedence)
log_level = "info"

# Prometheus metrics are always available at /metrics on the server port
"#
}
