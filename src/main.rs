use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use recipe_admin_api::config::config;
use recipe_admin_api::database::{DatabaseManager, MemoryStore, PgStore};
use recipe_admin_api::{app, is_production, AppState};

#[derive(Debug, Parser)]
#[command(name = "recipe-admin-api", version, about = "Recipe admin API server")]
struct Args {
    /// Interface to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// Serve the seeded in-memory store instead of PostgreSQL
    #[arg(long)]
    memory: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so DATABASE_URL and friends are picked up
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")))
        .init();

    let args = Args::parse();
    let config = config();
    info!("Starting recipe admin API in {:?} mode", config.environment);

    let state = match (&config.database.url, args.memory) {
        (Some(_), false) => {
            let pool = DatabaseManager::connect(&config.database).await.context("connecting to PostgreSQL")?;
            AppState::from_store(Arc::new(PgStore::new(pool)), config)
        }
        (url, _) => {
            if url.is_none() && !args.memory {
                warn!("DATABASE_URL is not set; falling back to the in-memory store");
            }
            if is_production!() {
                warn!("in-memory store in production: changes are lost on restart");
            }
            AppState::from_store(Arc::new(MemoryStore::seeded()), config)
        }
    };

    let listener = TcpListener::bind((args.host.as_str(), args.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", args.host, args.port))?;
    info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app(state)).await?;
    Ok(())
}
