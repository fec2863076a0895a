use std::sync::Arc;

use anyhow::{bail, Context};
use axum::{extract::Request, ServiceExt};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use planner_api::config::AppConfig;
use planner_api::database::{DocumentStore, PgDocumentStore};
use planner_api::state::{memory_store, AppState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StoreKind {
    Memory,
    Postgres,
}

#[derive(Parser)]
#[command(name = "planner-api")]
#[command(about = "Floor plan storage API with JWT sessions")]
#[command(version)]
struct Cli {
    #[arg(long, help = "Address to bind (overrides HOST)")]
    host: Option<String>,

    #[arg(long, help = "Port to listen on (overrides PORT)")]
    port: Option<u16>,

    #[arg(long, value_enum, help = "Document store backend; defaults to postgres when DATABASE_URL is set")]
    store: Option<StoreKind>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("planner_api=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env();
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    tracing::info!("Starting planner-api in {:?} mode", config.environment);

    let store = open_store(&config, cli.store).await?;
    let state = AppState::new(&config, store.clone()).context("invalid security configuration")?;
    let app = planner_api::app(state, &config);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Listening on http://{}", bind_addr);

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    store.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn open_store(config: &AppConfig, requested: Option<StoreKind>) -> anyhow::Result<Arc<dyn DocumentStore>> {
    let kind = requested.unwrap_or(if config.database.url.is_some() {
        StoreKind::Postgres
    } else {
        StoreKind::Memory
    });

    match kind {
        StoreKind::Postgres => {
            let store = PgDocumentStore::connect(&config.database)
                .await
                .context("failed to open Postgres document store")?;
            Ok(Arc::new(store))
        }
        StoreKind::Memory => {
            if config.is_production() {
                bail!("the in-memory store is not allowed in production; set DATABASE_URL");
            }
            tracing::warn!("Using in-memory document store; data is lost on exit");
            Ok(memory_store())
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
