use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use review_assigner::config::{AppConfig, DEFAULT_CONFIG_PATH};
use review_assigner::database::Database;
use review_assigner::handlers::{self, AppState};
use review_assigner::workflow::ReviewWorkflow;

#[derive(Debug, Parser)]
#[command(name = "review-assigner", about = "Pull request reviewer assignment service")]
struct Args {
    /// Path to the TOML config file (optional)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the listen port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "review_assigner=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting review assigner");

    let args = Args::parse();

    let mut config = AppConfig::load(&args.config).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.server_port = port;
    }
    info!("Configuration loaded");

    let database = Database::new(&config.database_url, config.database_max_connections)
        .await
        .context("Failed to connect to database")?;
    database
        .run_migrations()
        .await
        .context("Failed to run migrations")?;
    info!("Database migrations completed");

    let workflow = ReviewWorkflow::new(Arc::new(database.clone()));
    let state = AppState::new(config.clone(), workflow);
    let app = handlers::router(state);

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down");
    if tokio::time::timeout(config.shutdown_timeout(), database.close())
        .await
        .is_err()
    {
        warn!("Database pool did not close within {:?}", config.shutdown_timeout());
    }
    info!("Server exited");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", e);
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
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
