//! smartsafe-gate - Authentication and access-control gate for the smartsafe web service
//!
//! This is the main entry point for the smartsafe-gate application.

use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{error, info};

use smartsafe_gate::account::UserService;
use smartsafe_gate::admission::RequestAdmission;
use smartsafe_gate::auth::AuthenticationGate;
use smartsafe_gate::config::Config;
use smartsafe_gate::directory::SqliteDirectory;
use smartsafe_gate::error::AppError;
use smartsafe_gate::otel::{init_tracing, Metrics, OtelProvider};
use smartsafe_gate::server::{AppState, Server};

/// smartsafe-gate - Authentication and access-control gate for the smartsafe web service
#[derive(Parser, Debug)]
#[command(name = "smartsafe-gate")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "SMARTSAFE_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = load_config(&args)?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    let otel_provider = OtelProvider::new(&config.otel)?;
    init_tracing(&otel_provider, &config.logging)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting smartsafe-gate"
    );

    let result = run(&config, &otel_provider).await;
    if let Err(e) = &result {
        error!(error = %e, "smartsafe-gate stopped with an error");
    }

    if let Err(e) = otel_provider.shutdown() {
        error!(error = %e, "Failed to shutdown OpenTelemetry");
    }

    info!("smartsafe-gate shutdown complete");

    result.map_err(Into::into)
}

/// Wire the directory, gate, policy and server, then serve until shutdown
async fn run(config: &Config, otel_provider: &OtelProvider) -> Result<(), AppError> {
    let directory = Arc::new(SqliteDirectory::new(&config.database.path).await?);
    let schema_version = directory.schema_version().await?;
    info!(
        path = %config.database.path,
        schema_version,
        "User directory initialized"
    );

    let gate_config = config.security.gate_config()?;
    let gate = Arc::new(AuthenticationGate::new(Arc::clone(&directory), gate_config)?);
    info!(
        algorithm = %gate.hasher().algorithm(),
        cost = gate.hasher().cost(),
        directory_timeout_ms = config.security.directory_timeout_ms,
        "Authentication gate initialized"
    );

    let policy = Arc::new(config.security.access_policy()?);
    info!(
        public_paths = ?policy.public_patterns(),
        "Access policy loaded"
    );

    let admission = Arc::new(RequestAdmission::new(Arc::clone(&gate), policy));
    let accounts = Arc::new(UserService::new(gate));
    let metrics = Arc::new(Metrics::new(&otel_provider.meter()));

    let state = AppState::new(
        admission,
        accounts,
        config.channel.clone(),
        config.security.realm.clone(),
    )
    .with_metrics(metrics);

    let server = Server::new(config.server.clone(), state);

    info!(
        host = %config.server.host,
        port = %config.server.port,
        "Starting HTTP server"
    );

    server.run(shutdown_signal()).await?;
    Ok(())
}

/// Load configuration from file or environment
fn load_config(args: &Args) -> anyhow::Result<Config> {
    match &args.config {
        Some(path) => {
            // Use eprintln! since tracing is not yet initialized
            eprintln!("Loading configuration from file: {}", path);
            Config::from_file(path).map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
        }
        None => {
            eprintln!("Loading configuration from environment variables");
            Config::from_env().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
        }
    }
}

/// Create a future that resolves when a shutdown signal is received
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
