//! Jagdlog Sync Server
//!
//! Serves push/pull sync and shot analysis for Jagdlog clients over HTTP.
//!
//! # Configuration
//!
//! Environment variables:
//! - `JAGDLOG_PORT`: Port to listen on (default: 8080)
//! - `JAGDLOG_SERVER_DATABASE`: SQLite database (default: ~/.local/share/jagdlog-server/jagdlog.db)
//! - `JAGDLOG_PULL_PAGE_SIZE`: Rows per table in a pull (default: 100)
//! - `JAGDLOG_HISTORY_LIMIT`: Analyses per history request (default: 50)
//!
//! # Endpoints
//!
//! - `GET /health`: Health check endpoint
//! - `POST /api/sync`, `GET /api/sync`: change sync
//! - `POST /api/shot-analysis`, `GET /api/shot-analysis`: shot assessment

use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jagdlog::db::init_db;
use jagdlog::server::{app_router, AppState, ServerConfig};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jagdlog_server=info,jagdlog=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;

    tracing::info!("Database: {}", config.database_path.display());
    tracing::info!(
        "Feed page size: {}, history limit: {}",
        config.pull_page_size,
        config.history_limit
    );

    let pool = init_db(&config.database_path).await?;
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = app_router(AppState::new(pool, config));

    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
