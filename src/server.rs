//! Router assembly and server lifecycle

use axum::{Router, middleware, routing::get};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{catch_panic::CatchPanicLayer, services::ServeDir, trace::TraceLayer};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::handlers::{self, AppState};
use crate::metrics::Metrics;
use crate::middleware::track_metrics;
use crate::sampler::{DiskUsageSampler, SystemMemory};

/// Build the application router
///
/// Explicit routes win over files of the same name in the public directory.
/// Layers, innermost first: panic-to-500, instrumentation, request tracing.
/// Both layered with `Router::layer`, so the fallback is instrumented too.
pub fn build_router(state: AppState) -> Router {
    let public_dir = state.config().server.public_dir.clone();

    Router::new()
        .route("/", get(handlers::greeting::handler))
        .route("/login", get(handlers::session::login))
        .route("/logout", get(handlers::session::logout))
        .route("/metrics", get(handlers::metrics::handler))
        .fallback_service(ServeDir::new(public_dir))
        .layer(CatchPanicLayer::new())
        .layer(middleware::from_fn_with_state(state.clone(), track_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Line written to stdout once the socket is bound
pub fn startup_line(port: u16) -> String {
    format!("App is running at http://localhost:{}", port)
}

/// Serve on an already bound listener until `shutdown` is cancelled
///
/// Starts the disk-usage sampler, announces the listening port on stdout and
/// stops the sampler once the server has drained.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: CancellationToken,
) -> AppResult<()> {
    let sampler = DiskUsageSampler::spawn(
        state.metrics().clone(),
        SystemMemory::new(),
        state.config().sampler.interval(),
        shutdown.child_token(),
    );

    let local_addr = listener.local_addr()?;
    println!("{}", startup_line(local_addr.port()));
    tracing::info!(%local_addr, "Listening");

    let server_shutdown = shutdown.clone();
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
        .await?;

    shutdown.cancel();
    if let Err(e) = sampler.await {
        tracing::warn!(error = %e, "Disk usage sampler ended abnormally");
    }

    tracing::info!("Server stopped");
    Ok(())
}

/// Build the registry, bind the configured address and serve until Ctrl+C or SIGTERM
pub async fn run(config: Config) -> AppResult<()> {
    let config = Arc::new(config);
    let metrics = Metrics::new()?;
    let state = AppState::new(config.clone(), metrics);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| AppError::Bind {
            addr: addr.clone(),
            source,
        })?;

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        signal_token.cancel();
    });

    serve(listener, state, shutdown).await
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM signal");
        }
    }
}
