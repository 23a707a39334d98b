use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use keystone::config::init_config;
use keystone::errors::{LicenseError, LicenseResult};
use keystone::server::{build_router, AppState, Database};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("keystone_server: {e}");
        std::process::exit(1);
    }
}

async fn run() -> LicenseResult<()> {
    let config = init_config()?;

    if config.logging.enabled {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(&config.logging.level))
            .init();
    }

    let db = Database::new().await?;
    db.migrate().await?;

    let app = build_router(AppState { db });

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| LicenseError::ConfigError(format!("invalid server address: {e}")))?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| LicenseError::ServerError(format!("failed to bind {addr}: {e}")))?;

    info!(%addr, db_type = %config.database.db_type, "Keystone server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| LicenseError::ServerError(e.to_string()))
}
