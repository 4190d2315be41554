//! CoachTrack Sync Server
//!
//! Stores workout plans and logs and serves the sync endpoints for
//! multi-device clients.
//!
//! # Configuration
//!
//! Environment variables:
//! - `COACHTRACK_PORT`: Port to listen on (default: 8787)
//! - `COACHTRACK_SERVER_DB`: Path to the SQLite database
//!   (default: ~/.local/share/coachtrack-server/coachtrack.db)
//!
//! # Endpoints
//!
//! - `GET /health`: Health check
//! - `POST /api/register`: Issue a client id
//! - `GET /api/sync`: Download plans and logs changed since a checkpoint
//! - `POST /api/sync`: Upload logs for merge
//! - `GET /api/status`: Server counters and last sync checkpoint

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coachtrack::db::init_db;
use coachtrack::server::{router, AppState, Coordinator};

struct Config {
    port: u16,
    database_path: PathBuf,
}

impl Config {
    fn from_env() -> Self {
        let port = std::env::var("COACHTRACK_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8787);

        let database_path = std::env::var("COACHTRACK_SERVER_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home)
                    .join(".local")
                    .join("share")
                    .join("coachtrack-server")
                    .join("coachtrack.db")
            });

        Self {
            port,
            database_path,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coachtrack=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    tracing::info!("Database: {}", config.database_path.display());

    let (reader, writer) = match init_db(&config.database_path).await {
        Ok(handles) => handles,
        Err(e) => {
            tracing::error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    let state = AppState {
        coordinator: Arc::new(Coordinator::new(reader, writer)),
    };
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
