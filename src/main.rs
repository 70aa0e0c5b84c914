//! promdemo HTTP server
//!
//! Starts an Axum web server that serves the demo routes and exposes
//! Prometheus metrics at `/metrics`.

use clap::Parser;
use promdemo::{
    cli::{Cli, Command, generate_config_template},
    config::Config,
    server, telemetry,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Command::Config { output }) = cli.command {
        match output {
            Some(path) => {
                std::fs::write(&path, generate_config_template())?;
                eprintln!("Wrote configuration template to {}", path.display());
            }
            None => print!("{}", generate_config_template()),
        }
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref())?;

    telemetry::init(&config.observability.log_level);

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        public_dir = %config.server.public_dir.display(),
        "Starting promdemo server"
    );

    server::run(config).await?;

    Ok(())
}
