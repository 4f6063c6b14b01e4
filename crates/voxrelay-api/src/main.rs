//! Voxrelay server entry point.
//!
//! Binary name: `voxd`
//!
//! Parses CLI arguments, loads configuration from the environment,
//! restores the persisted conversation history, and serves the HTTP API
//! until Ctrl+C or SIGTERM. A final history flush runs after the listener
//! shuts down.

mod http;
mod state;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use voxrelay_infra::config::ServerConfig;

use state::AppState;

#[derive(Debug, Parser)]
#[command(name = "voxd", version, about = "Voice assistant relay server")]
struct Cli {
    /// Address to bind.
    #[arg(long, env = "VOXRELAY_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on.
    #[arg(short, long, env = "VOXRELAY_PORT", default_value_t = 5000)]
    port: u16,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info",
        1 => "info,voxrelay=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    let config = ServerConfig::from_env();
    let state = AppState::init(&config).await?;

    let addr = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        whisper_model = %config.whisper_model,
        claude_model = %config.claude_model,
        "voxrelay listening on http://{addr}"
    );

    let engine = Arc::clone(&state.engine);
    let router = http::router::build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Persist whatever is in memory before exiting.
    engine.flush().await;
    tracing::info!("server stopped");

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
